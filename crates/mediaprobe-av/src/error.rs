//! Error types for mediaprobe-av.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result codes owned by this crate.
///
/// Native failures are not listed here: they keep the negative code the
/// library reported (see [`Error::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Everything went all right.
    Ok = 0,
    /// The caller's input was not what the probe expects.
    InputFailure = 1,
    /// A native allocation returned null.
    Alloc = 2,
    /// The container opened but no input format was attached to it.
    FormatNotAvailable = 3,
    /// A required shared library could not be opened, or has the wrong major version.
    LibNotFound = 4,
    /// A required symbol is missing from an opened library.
    FuncNotFound = 5,
}

impl ErrorCode {
    /// Integer value of the code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Errors that can occur while probing a container.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid caller input, detected before any resource is touched.
    #[error("invalid input: {0}")]
    InputFailure(String),

    /// A native allocator returned null.
    #[error("allocation failed: {what}")]
    Alloc { what: &'static str },

    /// No input format descriptor was attached after a successful open.
    #[error("input format not available")]
    FormatNotAvailable,

    /// A required shared library could not be opened.
    #[error("library not found: {library}: {message}")]
    LibNotFound { library: String, message: String },

    /// A library opened, but its major version is not the one the native
    /// layouts are written for.
    #[error("{library} at {path} has major version {found}, expected {expected}")]
    AbiMismatch {
        library: String,
        path: String,
        expected: u32,
        found: u32,
    },

    /// A required symbol could not be resolved.
    #[error("function not found: {symbol} in {library}")]
    FuncNotFound { symbol: String, library: String },

    /// The native library reported a failure; `code` is passed through untouched.
    #[error("native error {code}: {message}")]
    Native { code: i32, message: String },
}

impl Error {
    /// Create an input failure error.
    pub fn input_failure(message: impl Into<String>) -> Self {
        Self::InputFailure(message.into())
    }

    /// Create an allocation error.
    pub fn alloc(what: &'static str) -> Self {
        Self::Alloc { what }
    }

    /// Create a library not found error.
    pub fn lib_not_found(library: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LibNotFound {
            library: library.into(),
            message: message.into(),
        }
    }

    /// Create a function not found error.
    pub fn func_not_found(symbol: impl Into<String>, library: impl Into<String>) -> Self {
        Self::FuncNotFound {
            symbol: symbol.into(),
            library: library.into(),
        }
    }

    /// Terminal result code for this error.
    ///
    /// Codes owned by this crate are small positive integers; native codes
    /// are returned verbatim and are always negative.
    pub fn code(&self) -> i32 {
        match self {
            Error::InputFailure(_) => ErrorCode::InputFailure.as_i32(),
            Error::Alloc { .. } => ErrorCode::Alloc.as_i32(),
            Error::FormatNotAvailable => ErrorCode::FormatNotAvailable.as_i32(),
            Error::LibNotFound { .. } | Error::AbiMismatch { .. } => {
                ErrorCode::LibNotFound.as_i32()
            }
            Error::FuncNotFound { .. } => ErrorCode::FuncNotFound.as_i32(),
            Error::Native { code, .. } => *code,
        }
    }

    /// Whether the failure was reported by the native library.
    pub fn is_native(&self) -> bool {
        matches!(self, Error::Native { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_codes_are_small_positive() {
        assert_eq!(Error::input_failure("x").code(), 1);
        assert_eq!(Error::alloc("format context").code(), 2);
        assert_eq!(Error::FormatNotAvailable.code(), 3);
        assert_eq!(Error::lib_not_found("libavformat", "nope").code(), 4);
        assert_eq!(Error::func_not_found("av_malloc", "libavutil").code(), 5);
    }

    #[test]
    fn test_abi_mismatch_reports_as_library_not_found() {
        let err = Error::AbiMismatch {
            library: "libavformat".to_string(),
            path: "libavformat.so".to_string(),
            expected: 57,
            found: 58,
        };
        assert_eq!(err.code(), ErrorCode::LibNotFound.as_i32());
        assert!(err.to_string().contains("major version 58, expected 57"));
    }

    #[test]
    fn test_native_code_passes_through() {
        let err = Error::Native {
            code: -1094995529,
            message: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(err.code(), -1094995529);
        assert!(err.is_native());
    }
}
