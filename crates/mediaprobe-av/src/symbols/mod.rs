//! Runtime symbol resolution.
//!
//! A probe opens its own [`Libraries`], resolves every [`Capability`] into a
//! [`Resolution`], and only then converts it into a typed [`SymbolTable`].
//! The conversion is all-or-nothing: a table with a missing entry point is
//! never produced. [`Symbols`] keeps the table and the libraries together so
//! they are released together.

mod loader;

pub use loader::{Libraries, LoadedLibrary};

use crate::capability::{Capability, LibraryKind};
use crate::config::LoaderConfig;
use crate::ffi;
use crate::{Error, Result};
use libc::{c_char, c_int, c_void};
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Size of the buffer handed to the error-to-string capability.
const ERROR_TEXT_LEN: usize = 128;

/// Resolved address of one entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(*const c_void);

impl RawSymbol {
    pub fn address(self) -> *const c_void {
        self.0
    }
}

/// Per-capability resolution state, indexed by [`Capability::index`].
#[derive(Debug, Clone)]
pub struct Resolution {
    slots: [Option<RawSymbol>; Capability::COUNT],
}

impl Resolution {
    /// Look every capability up in its owning library.
    pub fn resolve(libraries: &Libraries) -> Self {
        let mut slots = [None; Capability::COUNT];
        for capability in Capability::ALL {
            let library = libraries.get(capability.owner());
            slots[capability.index()] = library.raw_symbol(capability.symbol()).map(RawSymbol);
            if slots[capability.index()].is_none() {
                debug!("{} not exported by {}", capability, library.path().display());
            }
        }
        Self { slots }
    }

    /// Resolved address for `capability`, if any.
    pub fn get(&self, capability: Capability) -> Option<RawSymbol> {
        self.slots[capability.index()]
    }

    /// Capabilities that did not resolve.
    pub fn missing(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.get(*capability).is_none())
    }

    /// Whether every capability resolved.
    pub fn is_complete(&self) -> bool {
        self.missing().next().is_none()
    }

    /// Convert into a typed table.
    ///
    /// Fails with [`Error::FuncNotFound`] naming the first unresolved entry
    /// point.
    pub fn into_table(self) -> Result<SymbolTable> {
        if let Some(capability) = self.missing().next() {
            return Err(Error::func_not_found(
                capability.symbol(),
                capability.owner().name(),
            ));
        }

        let slot = |capability: Capability| {
            self.slots[capability.index()]
                .map(RawSymbol::address)
                .unwrap_or(std::ptr::null())
        };

        // SAFETY: every slot is a non-null address of the named export, and
        // each is given the signature that export has in the supported ABI.
        unsafe {
            use std::mem::transmute;
            Ok(SymbolTable {
                alloc_context: transmute::<*const c_void, ffi::AllocContextFn>(slot(
                    Capability::AllocContext,
                )),
                malloc: transmute::<*const c_void, ffi::MallocFn>(slot(Capability::Malloc)),
                close_input: transmute::<*const c_void, ffi::CloseInputFn>(slot(
                    Capability::CloseInput,
                )),
                alloc_io_context: transmute::<*const c_void, ffi::AllocIoContextFn>(slot(
                    Capability::AllocIoContext,
                )),
                open_input: transmute::<*const c_void, ffi::OpenInputFn>(slot(
                    Capability::OpenInput,
                )),
                find_stream_info: transmute::<*const c_void, ffi::FindStreamInfoFn>(slot(
                    Capability::FindStreamInfo,
                )),
                find_best_stream: transmute::<*const c_void, ffi::FindBestStreamFn>(slot(
                    Capability::FindBestStream,
                )),
                register_all: transmute::<*const c_void, ffi::RegisterAllFn>(slot(
                    Capability::RegisterAll,
                )),
                error_to_string: transmute::<*const c_void, ffi::ErrorToStringFn>(slot(
                    Capability::ErrorToString,
                )),
                free: transmute::<*const c_void, ffi::FreeFn>(slot(Capability::Free)),
                format_version: transmute::<*const c_void, ffi::VersionFn>(slot(
                    Capability::FormatVersion,
                )),
                util_version: transmute::<*const c_void, ffi::VersionFn>(slot(
                    Capability::UtilVersion,
                )),
            })
        }
    }
}

/// Typed entry points, valid while the libraries they came from are open.
pub struct SymbolTable {
    pub(crate) alloc_context: ffi::AllocContextFn,
    pub(crate) malloc: ffi::MallocFn,
    pub(crate) close_input: ffi::CloseInputFn,
    pub(crate) alloc_io_context: ffi::AllocIoContextFn,
    pub(crate) open_input: ffi::OpenInputFn,
    pub(crate) find_stream_info: ffi::FindStreamInfoFn,
    pub(crate) find_best_stream: ffi::FindBestStreamFn,
    pub(crate) register_all: ffi::RegisterAllFn,
    pub(crate) error_to_string: ffi::ErrorToStringFn,
    pub(crate) free: ffi::FreeFn,
    pub(crate) format_version: ffi::VersionFn,
    pub(crate) util_version: ffi::VersionFn,
}

impl SymbolTable {
    /// Version reported by the library of `kind`, as `AV_VERSION_INT`.
    pub fn version(&self, kind: LibraryKind) -> u32 {
        let version = match kind {
            LibraryKind::Format => self.format_version,
            LibraryKind::Util => self.util_version,
        };
        // SAFETY: no preconditions.
        unsafe { version() }
    }

    /// Human-readable text for a native error code.
    pub fn describe_error(&self, code: i32) -> String {
        let mut buf = [0 as c_char; ERROR_TEXT_LEN];
        // SAFETY: the buffer is writable for its full length and the library
        // always NUL-terminates within `errbuf_size`.
        let ret = unsafe { (self.error_to_string)(code as c_int, buf.as_mut_ptr(), buf.len()) };
        if ret >= 0 {
            // SAFETY: see above.
            return unsafe { CStr::from_ptr(buf.as_ptr()) }
                .to_string_lossy()
                .into_owned();
        }

        // Codes built from errno values are the negated errno.
        if code < 0 {
            std::io::Error::from_raw_os_error(-code).to_string()
        } else {
            format!("unknown error {code}")
        }
    }

    /// Wrap a negative native return code into an error carrying its text.
    pub fn native_error(&self, code: i32) -> Error {
        Error::Native {
            code,
            message: self.describe_error(code),
        }
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable").finish_non_exhaustive()
    }
}

/// Opened libraries plus the table resolved from them.
///
/// Fields drop in declaration order: the table is gone before the libraries
/// close.
#[derive(Debug)]
pub struct Symbols {
    table: SymbolTable,
    libraries: Libraries,
}

impl Symbols {
    /// Open the libraries and resolve every capability.
    pub fn load(config: &LoaderConfig) -> Result<Self> {
        let libraries = Libraries::open(config)?;
        let table = Resolution::resolve(&libraries).into_table().map_err(|e| {
            warn!("Symbol resolution failed: {}", e);
            e
        })?;
        debug!("Resolved {} native entry points", Capability::COUNT);

        for kind in LibraryKind::ALL {
            check_abi(kind, table.version(kind), libraries.get(kind).path()).map_err(|e| {
                warn!("{}", e);
                e
            })?;
        }
        Ok(Self { table, libraries })
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }
}

/// Reject a library whose major version differs from the one the
/// [`ffi`] layouts describe.
pub fn check_abi(kind: LibraryKind, version: u32, path: &Path) -> Result<()> {
    let found = ffi::version_major(version);
    if found != kind.abi_major() {
        return Err(Error::AbiMismatch {
            library: kind.name().to_string(),
            path: path.display().to_string(),
            expected: kind.abi_major(),
            found,
        });
    }
    Ok(())
}

/// Resolution status of one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolStatus {
    pub capability: Capability,
    pub resolved: bool,
}

/// What [`inspect`] found for one library.
#[derive(Debug, Clone)]
pub struct LibraryReport {
    pub kind: LibraryKind,
    /// Path the library opened from.
    pub path: Option<PathBuf>,
    /// Why the library could not be opened or cannot be used.
    pub error: Option<String>,
    /// Status of every capability owned by this library.
    pub symbols: Vec<SymbolStatus>,
}

impl LibraryReport {
    /// Opened with the expected major version and every owned capability
    /// resolved.
    pub fn is_usable(&self) -> bool {
        self.path.is_some() && self.error.is_none() && self.symbols.iter().all(|s| s.resolved)
    }
}

/// Report library and symbol availability without failing fast.
pub fn inspect(config: &LoaderConfig) -> Vec<LibraryReport> {
    LibraryKind::ALL
        .into_iter()
        .map(|kind| {
            let owned = Capability::ALL.into_iter().filter(move |c| c.owner() == kind);
            match LoadedLibrary::open(kind, config) {
                Ok(library) => LibraryReport {
                    kind,
                    path: Some(library.path().to_path_buf()),
                    error: library
                        .version()
                        .and_then(|version| check_abi(kind, version, library.path()).err())
                        .map(|e| e.to_string()),
                    symbols: owned
                        .map(|capability| SymbolStatus {
                            capability,
                            resolved: library.raw_symbol(capability.symbol()).is_some(),
                        })
                        .collect(),
                },
                Err(e) => LibraryReport {
                    kind,
                    path: None,
                    error: Some(e.to_string()),
                    symbols: owned
                        .map(|capability| SymbolStatus {
                            capability,
                            resolved: false,
                        })
                        .collect(),
                },
            }
        })
        .collect()
}
