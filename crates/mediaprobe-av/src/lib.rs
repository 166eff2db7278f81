//! # mediaprobe-av
//!
//! Coarse media container metadata through a runtime-loaded libavformat.
//!
//! Nothing links against FFmpeg at build time. Each probe opens libavformat
//! and libavutil, resolves the entry points it needs, and closes them again
//! when it is done. The probe reports:
//! - Duration, with where it was read from
//! - Frame width, height and decoder delay of the best video stream
//! - Video and audio codec names
//! - The container format name
//!
//! Input is either a file path handed to the library, or an in-memory buffer
//! fed to it through a read callback.
//!
//! ## Example
//!
//! ```no_run
//! use mediaprobe_av::{probe, ProbeConfig, Source};
//!
//! let data = std::fs::read("/path/to/video.ogv")?;
//! let metadata = probe(Source::Buffer(&data), &ProbeConfig::default())?;
//! println!("Format: {:?}", metadata.format);
//! println!("Video: {:?} {}x{}", metadata.video_codec, metadata.width, metadata.height);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Library lookup
//!
//! Libraries are searched per [`LoaderConfig`]. [`LoaderConfig::with_env_overrides`]
//! applies `FFMPEG_LIB_DIR`, which restricts the search to one directory.

pub mod capability;
pub mod config;
mod error;
pub mod ffi;
pub mod metadata;
pub mod probe;
pub mod reader;
pub mod symbols;

// Re-exports
pub use capability::{Capability, LibraryKind};
pub use config::{LoaderConfig, ProbeConfig, DEFAULT_IO_BUFFER_SIZE, LIB_DIR_ENV};
pub use error::{Error, ErrorCode, Result};
pub use metadata::{DurationSource, Metadata};
pub use probe::{describe_error, probe, probe_into, Prober, Source};
pub use symbols::{inspect, LibraryReport, SymbolStatus, SymbolTable, Symbols};
