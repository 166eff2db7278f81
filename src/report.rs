//! Human-readable output for the CLI.

use mediaprobe_av::{DurationSource, LibraryReport, Metadata};
use std::fmt::Write;
use std::path::Path;

/// Render probe results as text.
pub fn render_metadata(file: &Path, metadata: &Metadata) -> String {
    let mut out = String::new();
    let unknown = "unknown";

    let _ = writeln!(out, "File: {}", file.display());
    let _ = writeln!(
        out,
        "Format: {}",
        metadata.format.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(out, "Duration: {}", render_duration(metadata));
    let _ = writeln!(
        out,
        "Video: {} {}x{}",
        metadata.video_codec.as_deref().unwrap_or(unknown),
        metadata.width,
        metadata.height
    );
    if metadata.delay > 0 {
        let _ = writeln!(out, "  Decoder delay: {} frames", metadata.delay);
    }
    let _ = writeln!(
        out,
        "Audio: {}",
        metadata.audio_codec.as_deref().unwrap_or("none")
    );
    out
}

fn render_duration(metadata: &Metadata) -> String {
    if let Some(duration) = metadata.duration() {
        let millis = duration.as_millis();
        let secs = millis / 1000;
        let mins = secs / 60;
        let hours = mins / 60;
        return format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours,
            mins % 60,
            secs % 60,
            millis % 1000
        );
    }
    match metadata.duration_source {
        DurationSource::VideoStream if metadata.duration >= 0 => {
            format!("{} (video stream time base)", metadata.duration)
        }
        _ => "unknown".to_string(),
    }
}

/// Render library inspection results, one line per library and per entry
/// point. Returns the text and whether everything resolved.
pub fn render_libraries(reports: &[LibraryReport]) -> (String, bool) {
    let mut out = String::new();
    let mut all_ok = true;

    for report in reports {
        let status = if report.is_usable() {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        let _ = write!(out, "{} {}", status, report.kind);
        if let Some(ref path) = report.path {
            let _ = write!(out, " - {}", path.display());
        }
        if let Some(ref error) = report.error {
            let _ = write!(out, " ({})", error);
        }
        let _ = writeln!(out);

        for symbol in &report.symbols {
            let mark = if symbol.resolved { "✓" } else { "✗" };
            let _ = writeln!(out, "    {} {}", mark, symbol.capability.symbol());
        }
    }

    (out, all_ok)
}
