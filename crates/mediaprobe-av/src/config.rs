//! Probe and library loader configuration.

use crate::capability::LibraryKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the directory holding the native libraries.
pub const LIB_DIR_ENV: &str = "FFMPEG_LIB_DIR";

/// Default size of the staging buffer handed to the native I/O context.
pub const DEFAULT_IO_BUFFER_SIZE: usize = 4096;

/// Settings for a probe call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Size of the staging buffer used for in-memory probes.
    #[serde(default = "default_io_buffer_size")]
    pub io_buffer_size: usize,
}

fn default_io_buffer_size() -> usize {
    DEFAULT_IO_BUFFER_SIZE
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            io_buffer_size: default_io_buffer_size(),
        }
    }
}

/// Where and under which file names the native libraries are looked up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Only search this directory when set.
    #[serde(default)]
    pub lib_dir: Option<PathBuf>,

    /// Directories tried after the system loader's own search path.
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,

    /// Candidate file names for libavformat, tried in order.
    #[serde(default = "default_format_libraries")]
    pub format_libraries: Vec<String>,

    /// Candidate file names for libavutil, tried in order.
    #[serde(default = "default_util_libraries")]
    pub util_libraries: Vec<String>,
}

fn default_search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/local/lib")]
}

fn default_format_libraries() -> Vec<String> {
    candidate_names("avformat", LibraryKind::Format.abi_major())
}

fn default_util_libraries() -> Vec<String> {
    candidate_names("avutil", LibraryKind::Util.abi_major())
}

/// Versioned name first, then the unversioned development name.
fn candidate_names(stem: &str, major: u32) -> Vec<String> {
    let versioned = if cfg!(target_os = "windows") {
        format!("{stem}-{major}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{stem}.{major}.dylib")
    } else {
        format!("lib{stem}.so.{major}")
    };
    let plain = libloading::library_filename(stem)
        .to_string_lossy()
        .into_owned();
    vec![versioned, plain]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            lib_dir: None,
            search_dirs: default_search_dirs(),
            format_libraries: default_format_libraries(),
            util_libraries: default_util_libraries(),
        }
    }
}

impl LoaderConfig {
    /// Apply [`LIB_DIR_ENV`] on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(LIB_DIR_ENV) {
            if !dir.is_empty() {
                self.lib_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    /// Candidate file names for one library.
    pub fn candidates(&self, kind: LibraryKind) -> &[String] {
        match kind {
            LibraryKind::Format => &self.format_libraries,
            LibraryKind::Util => &self.util_libraries,
        }
    }

    /// Every path handed to the dynamic loader for `kind`, in the order tried.
    ///
    /// Bare file names defer to the platform loader's search path.
    pub fn search_order(&self, kind: LibraryKind) -> Vec<PathBuf> {
        let names = self.candidates(kind);
        if let Some(dir) = &self.lib_dir {
            return names.iter().map(|name| dir.join(name)).collect();
        }

        let mut paths: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        for dir in &self.search_dirs {
            paths.extend(names.iter().map(|name| dir.join(name)));
        }
        paths
    }
}
