//! Opening the native shared libraries.

use crate::capability::LibraryKind;
use crate::config::LoaderConfig;
use crate::ffi::VersionFn;
use crate::{Error, Result};
use libc::c_void;
use libloading::Library;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One opened shared library.
///
/// Closed exactly once, when dropped.
pub struct LoadedLibrary {
    kind: LibraryKind,
    path: PathBuf,
    library: Library,
}

impl LoadedLibrary {
    /// Open `kind` by trying every path of the configured search order.
    pub fn open(kind: LibraryKind, config: &LoaderConfig) -> Result<Self> {
        let mut last_error = None;

        for path in config.search_order(kind) {
            // SAFETY: loading runs the library's initialisers; libavformat and
            // libavutil have no initialisers with preconditions on the caller.
            match unsafe { open_pinned(&path) } {
                Ok(library) => {
                    debug!("Opened {} from {}", kind, path.display());
                    return Ok(Self {
                        kind,
                        path,
                        library,
                    });
                }
                Err(e) => {
                    trace!("Could not open {}: {}", path.display(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(Error::lib_not_found(
            kind.name(),
            last_error.unwrap_or_else(|| "no candidate file names configured".to_string()),
        ))
    }

    /// Version reported by the library's own version entry point, if it
    /// exports one.
    pub fn version(&self) -> Option<u32> {
        let address = self.raw_symbol(self.kind.version_capability().symbol())?;
        // SAFETY: `avformat_version` and `avutil_version` take no arguments
        // and return `unsigned`.
        unsafe {
            let version = std::mem::transmute::<*const c_void, VersionFn>(address);
            Some(version())
        }
    }

    /// Which library this is.
    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Address of an exported symbol, or `None` if it is not exported.
    pub fn raw_symbol(&self, name: &str) -> Option<*const c_void> {
        // SAFETY: the address is only read here; callers give it a type.
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.ok()?;
        let address = *symbol;
        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}

/// Open `path` so that it stays mapped after its handle is closed.
///
/// Registrations made by `av_register_all` live in the library's static data
/// and must survive the next probe reopening it.
#[cfg(unix)]
unsafe fn open_pinned(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_NOW};

    UnixLibrary::open(Some(path), RTLD_NOW | libc::RTLD_NODELETE).map(Library::from)
}

#[cfg(not(unix))]
unsafe fn open_pinned(path: &Path) -> std::result::Result<Library, libloading::Error> {
    Library::new(path)
}

impl Drop for LoadedLibrary {
    fn drop(&mut self) {
        debug!("Closing {} ({})", self.kind, self.path.display());
    }
}

impl std::fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .finish()
    }
}

/// Every library a probe needs, opened together.
#[derive(Debug)]
pub struct Libraries {
    format: LoadedLibrary,
    util: LoadedLibrary,
}

impl Libraries {
    /// Open libavformat then libavutil.
    ///
    /// If the second open fails the first library is closed before the
    /// error is returned.
    pub fn open(config: &LoaderConfig) -> Result<Self> {
        let format = LoadedLibrary::open(LibraryKind::Format, config)?;
        let util = LoadedLibrary::open(LibraryKind::Util, config)?;
        Ok(Self { format, util })
    }

    /// The opened library of the given kind.
    pub fn get(&self, kind: LibraryKind) -> &LoadedLibrary {
        match kind {
            LibraryKind::Format => &self.format,
            LibraryKind::Util => &self.util,
        }
    }
}
