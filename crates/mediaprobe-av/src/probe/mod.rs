//! Container probing.
//!
//! A probe runs a fixed sequence: validate the input, resolve the native
//! entry points, allocate a format context, attach the in-memory reader for
//! buffer input, open the container, check that a format was detected,
//! discover streams, select the best video (required) and audio (optional)
//! streams, and copy the fields out. Every native resource acquired along the
//! way is owned by a [`session::Session`] and released on every exit path.

mod extract;
mod session;

#[cfg(test)]
mod fake;

use crate::config::{LoaderConfig, ProbeConfig};
use crate::ffi::{MEDIA_TYPE_AUDIO, MEDIA_TYPE_VIDEO};
use crate::metadata::Metadata;
use crate::symbols::{SymbolTable, Symbols};
use crate::{Error, Result};
use session::Session;
use std::ffi::{CStr, CString};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Registration entry points already called, by address.
static REGISTERED: Mutex<Vec<usize>> = Mutex::new(Vec::new());

/// Run the registration entry point of the loaded library once.
///
/// Libraries stay mapped once opened, so reopening one yields the same entry
/// point and does not register again; a different library is registered on
/// first use.
fn ensure_registered(table: &SymbolTable) {
    let entry = table.register_all as usize;
    let mut registered = REGISTERED.lock().unwrap_or_else(PoisonError::into_inner);
    if registered.contains(&entry) {
        return;
    }
    debug!("Registering native formats and codecs");
    // SAFETY: no preconditions; the lock keeps it single-threaded.
    unsafe { (table.register_all)() };
    registered.push(entry);
}

/// What to probe.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Complete container bytes held by the caller.
    Buffer(&'a [u8]),
    /// A path opened by the native library itself.
    File(&'a Path),
}

impl<'a> Source<'a> {
    /// Build a source from the two optional halves of a request.
    ///
    /// Exactly one must be present.
    pub fn from_parts(buffer: Option<&'a [u8]>, filename: Option<&'a Path>) -> Result<Self> {
        match (buffer, filename) {
            (Some(buffer), None) => Ok(Source::Buffer(buffer)),
            (None, Some(filename)) => Ok(Source::File(filename)),
            (Some(_), Some(_)) => Err(Error::input_failure(
                "a buffer and a filename are mutually exclusive",
            )),
            (None, None) => Err(Error::input_failure("either a buffer or a filename is required")),
        }
    }

    /// Check the source without touching any native resource.
    pub fn validate(&self) -> Result<()> {
        self.native_url().map(|_| ())
    }

    /// Validated source; the path handed to the native library for a file.
    fn native_url(&self) -> Result<Option<CString>> {
        match self {
            Source::Buffer(data) if data.is_empty() => {
                Err(Error::input_failure("buffer must not be empty"))
            }
            Source::Buffer(data) if u32::try_from(data.len()).is_err() => Err(
                Error::input_failure(format!("buffer of {} bytes is too large", data.len())),
            ),
            Source::Buffer(_) => Ok(None),
            Source::File(path) => path_to_cstring(path).map(Some),
        }
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Result<&[u8]> {
    use std::os::unix::ffi::OsStrExt;

    Ok(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Result<&[u8]> {
    path.to_str()
        .map(str::as_bytes)
        .ok_or_else(|| Error::input_failure(format!("path is not valid UTF-8: {:?}", path)))
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let bytes = path_bytes(path)?;
    if bytes.is_empty() {
        return Err(Error::input_failure("filename must not be empty"));
    }
    CString::new(bytes)
        .map_err(|_| Error::input_failure(format!("path contains a NUL byte: {:?}", path)))
}

/// Probes containers through an already-resolved symbol table.
pub struct Prober<'t> {
    table: &'t SymbolTable,
    io_buffer_size: usize,
}

impl<'t> Prober<'t> {
    pub fn new(table: &'t SymbolTable, io_buffer_size: usize) -> Self {
        Self {
            table,
            io_buffer_size,
        }
    }

    /// Probe `source`.
    pub fn probe(&self, source: Source<'_>) -> Result<Metadata> {
        let url = source.native_url()?;
        self.run(source, url.as_deref())
    }

    /// Drive the native library over an already validated source.
    fn run(&self, source: Source<'_>, url: Option<&CStr>) -> Result<Metadata> {
        ensure_registered(self.table);

        let mut session = Session::alloc(self.table)?;
        if let Source::Buffer(data) = source {
            session.attach_reader(data, self.io_buffer_size)?;
        }

        session.open(url)?;

        let view = session.view()?;
        let format = view.format_name().ok_or(Error::FormatNotAvailable)?;
        debug!("Detected container format {}", format);

        session.find_stream_info()?;

        let video = session
            .find_best_stream(MEDIA_TYPE_VIDEO)
            .map_err(|code| session.table().native_error(code))?;
        let audio = match session.find_best_stream(MEDIA_TYPE_AUDIO) {
            Ok(audio) => Some(audio),
            Err(code) => {
                debug!("No audio stream selected ({})", code);
                None
            }
        };

        let view = session.view()?;
        extract::extract(view, &video, audio.as_ref())
    }

    /// Probe `source` into `out`.
    ///
    /// `out` is only written on success; its previous strings are dropped
    /// then.
    pub fn probe_into(&self, source: Source<'_>, out: &mut Metadata) -> Result<()> {
        *out = self.probe(source)?;
        Ok(())
    }
}

/// Probe `source`, loading and releasing the native libraries for this call.
///
/// # Example
///
/// ```no_run
/// use mediaprobe_av::{probe, ProbeConfig, Source};
/// use std::path::Path;
///
/// let config = ProbeConfig::default();
/// let metadata = probe(Source::File(Path::new("/path/to/video.webm")), &config)?;
/// println!("{:?} {}x{}", metadata.video_codec, metadata.width, metadata.height);
/// # Ok::<(), mediaprobe_av::Error>(())
/// ```
pub fn probe(source: Source<'_>, config: &ProbeConfig) -> Result<Metadata> {
    let url = source.native_url()?;

    let symbols = Symbols::load(&config.loader)?;
    let result = Prober::new(symbols.table(), config.io_buffer_size).run(source, url.as_deref());
    if let Err(ref e) = result {
        warn!("Probe failed with code {}: {}", e.code(), e);
    }
    result
}

/// Probe `source` into `out`, leaving `out` untouched on failure.
pub fn probe_into(source: Source<'_>, config: &ProbeConfig, out: &mut Metadata) -> Result<()> {
    *out = probe(source, config)?;
    Ok(())
}

/// Text the native library associates with `code`.
pub fn describe_error(code: i32, config: &LoaderConfig) -> Result<String> {
    let symbols = Symbols::load(config)?;
    Ok(symbols.table().describe_error(code))
}
