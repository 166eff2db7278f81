//! Probe output record.

use crate::ffi::TIME_BASE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where [`Metadata::duration`] was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// Not probed yet.
    #[default]
    Unknown,
    /// Container-level duration, in microseconds.
    Container,
    /// Duration of the selected video stream, in that stream's time base.
    VideoStream,
}

/// Coarse metadata of a probed container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Duration in the units given by `duration_source`; negative when unknown.
    pub duration: i64,
    pub duration_source: DurationSource,
    /// Frame width in pixels, 0 if unknown.
    pub width: u32,
    /// Frame height in pixels, 0 if unknown.
    pub height: u32,
    /// Decoder delay in frames.
    pub delay: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Short name of the container format (e.g. "matroska,webm", "ogg").
    pub format: Option<String>,
}

impl Metadata {
    /// Drop every owned string.
    ///
    /// Safe to call on a default record and to call repeatedly.
    pub fn release(&mut self) {
        self.video_codec = None;
        self.audio_codec = None;
        self.format = None;
    }

    /// Whether an audio stream was found.
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// Container duration as a [`Duration`].
    ///
    /// `None` when unknown or when the value came from the video stream,
    /// whose time base is not recorded.
    pub fn duration(&self) -> Option<Duration> {
        if self.duration_source != DurationSource::Container || self.duration < 0 {
            return None;
        }
        let micros = self.duration as u64 * (1_000_000 / TIME_BASE as u64);
        Some(Duration::from_micros(micros))
    }
}
