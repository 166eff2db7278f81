//! Foreign boundary with libavformat/libavutil.
//!
//! Function signatures are those of the libavformat 57 / libavutil 55 ABI
//! (the FFmpeg 3.x series, the last one exporting `av_register_all` with the
//! per-stream codec context still in place). Structs are *prefix views*:
//! each one declares fields up to the last one this crate reads and nothing
//! after it, so they must only ever be used behind pointers handed out by the
//! library.

use libc::{c_char, c_int, c_uchar, c_uint, c_void, size_t};
use std::ffi::CStr;
use std::marker::PhantomData;

/// `AVMEDIA_TYPE_VIDEO`.
pub const MEDIA_TYPE_VIDEO: c_int = 0;
/// `AVMEDIA_TYPE_AUDIO`.
pub const MEDIA_TYPE_AUDIO: c_int = 1;

/// libavformat major version these layouts match.
///
/// libavformat links the libavcodec of its own release, so this also pins the
/// `AVCodecContext` layout reached through [`AvStream::codec`].
pub const AVFORMAT_ABI_MAJOR: u32 = 57;
/// libavutil major version these layouts match.
pub const AVUTIL_ABI_MAJOR: u32 = 55;

/// Major component of an `AV_VERSION_INT` value.
pub fn version_major(version: c_uint) -> u32 {
    version >> 16
}

/// `AV_TIME_BASE`: container durations are expressed in these units per second.
pub const TIME_BASE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Entry point signatures
// ---------------------------------------------------------------------------

pub type AllocContextFn = unsafe extern "C" fn() -> *mut AvFormatContext;
pub type MallocFn = unsafe extern "C" fn(size: size_t) -> *mut c_void;
pub type CloseInputFn = unsafe extern "C" fn(s: *mut *mut AvFormatContext);
pub type ReadPacketFn =
    unsafe extern "C" fn(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int;
pub type WritePacketFn =
    unsafe extern "C" fn(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int;
pub type SeekFn = unsafe extern "C" fn(opaque: *mut c_void, offset: i64, whence: c_int) -> i64;
pub type AllocIoContextFn = unsafe extern "C" fn(
    buffer: *mut c_uchar,
    buffer_size: c_int,
    write_flag: c_int,
    opaque: *mut c_void,
    read_packet: Option<ReadPacketFn>,
    write_packet: Option<WritePacketFn>,
    seek: Option<SeekFn>,
) -> *mut AvIoContext;
pub type OpenInputFn = unsafe extern "C" fn(
    ps: *mut *mut AvFormatContext,
    url: *const c_char,
    fmt: *mut c_void,
    options: *mut *mut c_void,
) -> c_int;
pub type FindStreamInfoFn =
    unsafe extern "C" fn(ic: *mut AvFormatContext, options: *mut *mut c_void) -> c_int;
pub type FindBestStreamFn = unsafe extern "C" fn(
    ic: *mut AvFormatContext,
    media_type: c_int,
    wanted_stream_nb: c_int,
    related_stream: c_int,
    decoder_ret: *mut *const AvCodec,
    flags: c_int,
) -> c_int;
pub type RegisterAllFn = unsafe extern "C" fn();
pub type ErrorToStringFn =
    unsafe extern "C" fn(errnum: c_int, errbuf: *mut c_char, errbuf_size: size_t) -> c_int;
pub type FreeFn = unsafe extern "C" fn(ptr: *mut c_void);
pub type VersionFn = unsafe extern "C" fn() -> c_uint;

// ---------------------------------------------------------------------------
// Prefix views
// ---------------------------------------------------------------------------

/// `AVRational`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvRational {
    pub num: c_int,
    pub den: c_int,
}

/// Leading fields of `AVCodec`.
#[repr(C)]
pub struct AvCodec {
    pub name: *const c_char,
    pub long_name: *const c_char,
}

/// Leading fields of `AVInputFormat`.
#[repr(C)]
pub struct AvInputFormat {
    pub name: *const c_char,
    pub long_name: *const c_char,
}

/// Leading fields of `AVIOContext`.
#[repr(C)]
pub struct AvIoContext {
    pub av_class: *const c_void,
    /// Buffer currently in use; the library may swap it for a larger one.
    pub buffer: *mut c_uchar,
    pub buffer_size: c_int,
}

/// Leading fields of `AVCodecContext`, up to `height`.
#[repr(C)]
pub struct AvCodecContext {
    pub av_class: *const c_void,
    pub log_level_offset: c_int,
    pub codec_type: c_int,
    pub codec: *const AvCodec,
    pub codec_name: [c_char; 32],
    pub codec_id: c_int,
    pub codec_tag: c_uint,
    pub stream_codec_tag: c_uint,
    pub priv_data: *mut c_void,
    pub internal: *mut c_void,
    pub opaque: *mut c_void,
    pub bit_rate: i64,
    pub bit_rate_tolerance: c_int,
    pub global_quality: c_int,
    pub compression_level: c_int,
    pub flags: c_int,
    pub flags2: c_int,
    pub extradata: *mut u8,
    pub extradata_size: c_int,
    pub time_base: AvRational,
    pub ticks_per_frame: c_int,
    pub delay: c_int,
    pub width: c_int,
    pub height: c_int,
}

/// Leading fields of `AVStream`, up to `duration`.
#[repr(C)]
pub struct AvStream {
    pub index: c_int,
    pub id: c_int,
    pub codec: *mut AvCodecContext,
    pub priv_data: *mut c_void,
    pub time_base: AvRational,
    pub start_time: i64,
    pub duration: i64,
}

/// Leading fields of `AVFormatContext`, up to `duration`.
#[repr(C)]
pub struct AvFormatContext {
    pub av_class: *const c_void,
    pub iformat: *const AvInputFormat,
    pub oformat: *mut c_void,
    pub priv_data: *mut c_void,
    pub pb: *mut AvIoContext,
    pub ctx_flags: c_int,
    pub nb_streams: c_uint,
    pub streams: *mut *mut AvStream,
    pub filename: [c_char; 1024],
    pub start_time: i64,
    pub duration: i64,
}

/// Copy a nullable C string into an owned `String`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Read-only view of an opened container.
///
/// Exposes only the fields the probe reads.
#[derive(Clone, Copy)]
pub struct FormatView<'a> {
    raw: *const AvFormatContext,
    _marker: PhantomData<&'a AvFormatContext>,
}

impl<'a> FormatView<'a> {
    /// # Safety
    ///
    /// `raw` must be null or an opened format context that stays open for `'a`.
    pub unsafe fn from_ptr(raw: *const AvFormatContext) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        Some(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Short name of the detected input format, if a descriptor with a name
    /// is attached.
    pub fn format_name(&self) -> Option<String> {
        // SAFETY: the context is open for 'a, `iformat` is null or a static
        // descriptor owned by the library.
        unsafe {
            let iformat = (*self.raw).iformat;
            if iformat.is_null() {
                return None;
            }
            owned_string((*iformat).name)
        }
    }

    /// Container-level duration in [`TIME_BASE`] units; negative when unknown.
    pub fn duration(&self) -> i64 {
        // SAFETY: see `format_name`.
        unsafe { (*self.raw).duration }
    }

    /// Number of streams discovered so far.
    pub fn stream_count(&self) -> usize {
        // SAFETY: see `format_name`.
        unsafe { (*self.raw).nb_streams as usize }
    }

    /// Stream at `index`, if it exists.
    pub fn stream(&self, index: c_int) -> Option<StreamView<'a>> {
        let index = usize::try_from(index).ok()?;
        if index >= self.stream_count() {
            return None;
        }
        // SAFETY: `streams` holds `nb_streams` valid pointers while the
        // context is open.
        unsafe {
            let streams = (*self.raw).streams;
            if streams.is_null() {
                return None;
            }
            let stream = *streams.add(index);
            if stream.is_null() {
                return None;
            }
            Some(StreamView {
                raw: stream,
                _marker: PhantomData,
            })
        }
    }
}

/// Read-only view of one stream and its codec parameters.
#[derive(Clone, Copy)]
pub struct StreamView<'a> {
    raw: *const AvStream,
    _marker: PhantomData<&'a AvStream>,
}

impl StreamView<'_> {
    fn codec_context(&self) -> Option<&AvCodecContext> {
        // SAFETY: the stream belongs to an open context; `codec` is null or
        // owned by the stream.
        unsafe { (*self.raw).codec.as_ref() }
    }

    pub fn width(&self) -> u32 {
        self.codec_context()
            .and_then(|c| u32::try_from(c.width).ok())
            .unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.codec_context()
            .and_then(|c| u32::try_from(c.height).ok())
            .unwrap_or(0)
    }

    /// Decoder delay in frames.
    pub fn delay(&self) -> u32 {
        self.codec_context()
            .and_then(|c| u32::try_from(c.delay).ok())
            .unwrap_or(0)
    }

    /// Stream duration in the stream's own time base.
    pub fn duration(&self) -> i64 {
        // SAFETY: see `codec_context`.
        unsafe { (*self.raw).duration }
    }
}

/// Read-only view of a decoder descriptor returned by stream selection.
#[derive(Clone, Copy)]
pub struct CodecView<'a> {
    raw: *const AvCodec,
    _marker: PhantomData<&'a AvCodec>,
}

impl CodecView<'_> {
    /// # Safety
    ///
    /// `raw` must be null or a decoder descriptor owned by the library.
    pub unsafe fn from_ptr(raw: *const AvCodec) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        Some(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Short name, else long name.
    pub fn display_name(&self) -> Option<String> {
        // SAFETY: descriptors are static data in the library.
        unsafe { owned_string((*self.raw).name).or_else(|| owned_string((*self.raw).long_name)) }
    }
}
