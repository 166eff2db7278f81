//! Native entry points the probe depends on.

use std::fmt;

/// Shared library that owns a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// libavformat: container opening and stream discovery.
    Format,
    /// libavutil: allocation, release and error text.
    Util,
}

impl LibraryKind {
    /// Every library a probe needs, in load order.
    pub const ALL: [LibraryKind; 2] = [LibraryKind::Format, LibraryKind::Util];

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            LibraryKind::Format => "libavformat",
            LibraryKind::Util => "libavutil",
        }
    }

    /// Entry point reporting this library's version.
    pub fn version_capability(self) -> Capability {
        match self {
            LibraryKind::Format => Capability::FormatVersion,
            LibraryKind::Util => Capability::UtilVersion,
        }
    }

    /// Major version whose ABI the [`crate::ffi`] layouts describe.
    pub fn abi_major(self) -> u32 {
        match self {
            LibraryKind::Format => crate::ffi::AVFORMAT_ABI_MAJOR,
            LibraryKind::Util => crate::ffi::AVUTIL_ABI_MAJOR,
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of one resolved native entry point.
///
/// The discriminant is the slot index in a [`crate::symbols::Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AllocContext = 0,
    Malloc,
    CloseInput,
    AllocIoContext,
    OpenInput,
    FindStreamInfo,
    FindBestStream,
    RegisterAll,
    ErrorToString,
    Free,
    FormatVersion,
    UtilVersion,
}

impl Capability {
    /// Number of capabilities in the closed set.
    pub const COUNT: usize = 12;

    /// Every capability in slot order.
    pub const ALL: [Capability; Capability::COUNT] = [
        Capability::AllocContext,
        Capability::Malloc,
        Capability::CloseInput,
        Capability::AllocIoContext,
        Capability::OpenInput,
        Capability::FindStreamInfo,
        Capability::FindBestStream,
        Capability::RegisterAll,
        Capability::ErrorToString,
        Capability::Free,
        Capability::FormatVersion,
        Capability::UtilVersion,
    ];

    /// Slot index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Exported symbol name.
    pub fn symbol(self) -> &'static str {
        match self {
            Capability::AllocContext => "avformat_alloc_context",
            Capability::Malloc => "av_malloc",
            Capability::CloseInput => "avformat_close_input",
            Capability::AllocIoContext => "avio_alloc_context",
            Capability::OpenInput => "avformat_open_input",
            Capability::FindStreamInfo => "avformat_find_stream_info",
            Capability::FindBestStream => "av_find_best_stream",
            Capability::RegisterAll => "av_register_all",
            Capability::ErrorToString => "av_strerror",
            Capability::Free => "av_free",
            Capability::FormatVersion => "avformat_version",
            Capability::UtilVersion => "avutil_version",
        }
    }

    /// Library the symbol is exported from.
    pub fn owner(self) -> LibraryKind {
        match self {
            Capability::Malloc
            | Capability::ErrorToString
            | Capability::Free
            | Capability::UtilVersion => LibraryKind::Util,
            _ => LibraryKind::Format,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
