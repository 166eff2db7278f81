//! In-process stand-in for libavformat/libavutil.
//!
//! Every entry point of a [`SymbolTable`] is backed by an `extern "C"`
//! function below that works on the same prefix layouts as the real library.
//! State is per thread, so tests running in parallel do not see each other.
//! Native allocations are counted so tests can assert nothing leaked.

use crate::ffi::{
    AvCodec, AvCodecContext, AvFormatContext, AvInputFormat, AvIoContext, AvRational, AvStream,
    ReadPacketFn, SeekFn, WritePacketFn, MEDIA_TYPE_AUDIO, MEDIA_TYPE_VIDEO,
};
use crate::symbols::SymbolTable;
use libc::{c_char, c_int, c_uchar, c_uint, c_void, size_t};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `AVERROR_INVALIDDATA`.
pub const AVERROR_INVALIDDATA: c_int = -1_094_995_529;
/// `AVERROR_STREAM_NOT_FOUND`.
pub const AVERROR_STREAM_NOT_FOUND: c_int = -1_381_258_232;

static REGISTRATIONS: AtomicUsize = AtomicUsize::new(0);
static RELOADED_REGISTRATIONS: AtomicUsize = AtomicUsize::new(0);

/// Allocation that fails on its next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    AllocContext,
    Malloc,
    AllocIoContext,
}

#[derive(Debug, Clone)]
pub struct FakeStream {
    name: Option<&'static str>,
    long_name: Option<&'static str>,
    width: c_int,
    height: c_int,
    delay: c_int,
    duration: i64,
}

impl FakeStream {
    pub fn new(
        name: Option<&'static str>,
        long_name: Option<&'static str>,
        width: c_int,
        height: c_int,
        delay: c_int,
        duration: i64,
    ) -> Self {
        Self {
            name,
            long_name,
            width,
            height,
            delay,
            duration,
        }
    }
}

/// What a successful open exposes.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub format_name: Option<&'static str>,
    pub duration: i64,
    pub video: Option<FakeStream>,
    pub audio: Option<FakeStream>,
    pub find_info_result: c_int,
}

/// Read callback statistics for the last buffer open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reads {
    pub total: usize,
    pub largest: usize,
    pub calls_after_eof: usize,
}

#[derive(Default)]
struct State {
    files: HashMap<String, FakeContainer>,
    buffers: Option<(Vec<u8>, FakeContainer)>,
    fail: Option<Failure>,
    grow_io_buffer: bool,
    live: i64,
    reads: Reads,
}

thread_local! {
    static STATE: RefCell<State> = RefCell::new(State::default());
}

fn with_state<R>(f: impl FnOnce(&mut State) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

fn take_failure(failure: Failure) -> bool {
    with_state(|state| {
        if state.fail == Some(failure) {
            state.fail = None;
            true
        } else {
            false
        }
    })
}

pub fn reset() {
    with_state(|state| *state = State::default());
}

/// Serve `container` for `path`.
pub fn add_file(path: &str, container: FakeContainer) {
    with_state(|state| {
        state.files.insert(path.to_string(), container);
    });
}

/// Accept any buffer starting with `magic` as `container`.
pub fn accept_buffers(magic: &[u8], container: FakeContainer) {
    with_state(|state| state.buffers = Some((magic.to_vec(), container)));
}

pub fn fail_next(failure: Failure) {
    with_state(|state| state.fail = Some(failure));
}

/// Swap the I/O buffer for a larger one during the next open.
pub fn grow_io_buffer_on_open() {
    with_state(|state| state.grow_io_buffer = true);
}

/// Native allocations not yet released on this thread.
pub fn live_resources() -> i64 {
    with_state(|state| state.live)
}

pub fn reads() -> Reads {
    with_state(|state| state.reads)
}

/// Process-wide count of registration calls.
pub fn registrations() -> usize {
    REGISTRATIONS.load(Ordering::SeqCst)
}

/// Process-wide count of registration calls on the [`reloaded_table`] copy.
pub fn reloaded_registrations() -> usize {
    RELOADED_REGISTRATIONS.load(Ordering::SeqCst)
}

/// The same library loaded a second time, with its own registration state.
pub fn reloaded_table() -> SymbolTable {
    SymbolTable {
        register_all: register_all_reloaded,
        ..table()
    }
}

pub fn table() -> SymbolTable {
    SymbolTable {
        alloc_context,
        malloc,
        close_input,
        alloc_io_context,
        open_input,
        find_stream_info,
        find_best_stream,
        register_all,
        error_to_string,
        free,
        format_version,
        util_version,
    }
}

// ---------------------------------------------------------------------------
// Native objects
// ---------------------------------------------------------------------------

#[repr(C)]
struct FakeFormat {
    ctx: AvFormatContext,
    opened: Option<Box<Opened>>,
}

#[repr(C)]
struct FakeIo {
    ctx: AvIoContext,
    opaque: *mut c_void,
    read: Option<ReadPacketFn>,
}

#[derive(Default)]
struct Opened {
    names: Vec<CString>,
    format: Option<Box<AvInputFormat>>,
    contexts: Vec<Box<AvCodecContext>>,
    streams: Vec<Box<AvStream>>,
    stream_ptrs: Vec<*mut AvStream>,
    codecs: Vec<Box<AvCodec>>,
    video: Option<c_int>,
    audio: Option<c_int>,
    find_info_result: c_int,
}

impl Opened {
    fn keep(&mut self, text: Option<&str>) -> *const c_char {
        match text {
            Some(text) => {
                let owned = CString::new(text).unwrap();
                let ptr = owned.as_ptr();
                self.names.push(owned);
                ptr
            }
            None => ptr::null(),
        }
    }

    fn build(container: &FakeContainer) -> Box<Self> {
        let mut opened = Box::<Opened>::default();
        opened.find_info_result = container.find_info_result;

        if container.format_name.is_some() {
            let name = opened.keep(container.format_name);
            opened.format = Some(Box::new(AvInputFormat {
                name,
                long_name: ptr::null(),
            }));
        }

        for (stream, media_type) in [
            (&container.video, MEDIA_TYPE_VIDEO),
            (&container.audio, MEDIA_TYPE_AUDIO),
        ] {
            let Some(stream) = stream else { continue };
            let index = opened.stream_ptrs.len() as c_int;

            // SAFETY: every field is a pointer, an integer or an array of those.
            let mut context: Box<AvCodecContext> = Box::new(unsafe { mem::zeroed() });
            context.codec_type = media_type;
            context.width = stream.width;
            context.height = stream.height;
            context.delay = stream.delay;

            let name = opened.keep(stream.name);
            let long_name = opened.keep(stream.long_name);
            opened.codecs.push(Box::new(AvCodec { name, long_name }));

            let mut av_stream = Box::new(AvStream {
                index,
                id: index,
                codec: &mut *context,
                priv_data: ptr::null_mut(),
                time_base: AvRational { num: 1, den: 1000 },
                start_time: 0,
                duration: stream.duration,
            });
            opened.stream_ptrs.push(&mut *av_stream);
            opened.streams.push(av_stream);
            opened.contexts.push(context);

            if media_type == MEDIA_TYPE_VIDEO {
                opened.video = Some(index);
            } else {
                opened.audio = Some(index);
            }
        }
        opened
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

unsafe extern "C" fn register_all() {
    REGISTRATIONS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn register_all_reloaded() {
    RELOADED_REGISTRATIONS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn format_version() -> c_uint {
    (57 << 16) | (83 << 8) | 100
}

unsafe extern "C" fn util_version() -> c_uint {
    (55 << 16) | (78 << 8) | 100
}

unsafe extern "C" fn malloc(size: size_t) -> *mut c_void {
    if take_failure(Failure::Malloc) {
        return ptr::null_mut();
    }
    let block = libc::malloc(size);
    if !block.is_null() {
        with_state(|state| state.live += 1);
    }
    block
}

unsafe extern "C" fn free(block: *mut c_void) {
    if block.is_null() {
        return;
    }
    libc::free(block);
    with_state(|state| state.live -= 1);
}

unsafe extern "C" fn alloc_context() -> *mut AvFormatContext {
    if take_failure(Failure::AllocContext) {
        return ptr::null_mut();
    }
    let format = Box::new(FakeFormat {
        ctx: mem::zeroed(),
        opened: None,
    });
    with_state(|state| state.live += 1);
    Box::into_raw(format) as *mut AvFormatContext
}

unsafe fn release_format(s: *mut *mut AvFormatContext) {
    if s.is_null() || (*s).is_null() {
        return;
    }
    drop(Box::from_raw(*s as *mut FakeFormat));
    *s = ptr::null_mut();
    with_state(|state| state.live -= 1);
}

unsafe extern "C" fn close_input(s: *mut *mut AvFormatContext) {
    // Like the real one, a caller-supplied I/O context is left alone.
    release_format(s);
}

unsafe extern "C" fn alloc_io_context(
    buffer: *mut c_uchar,
    buffer_size: c_int,
    _write_flag: c_int,
    opaque: *mut c_void,
    read: Option<ReadPacketFn>,
    _write: Option<WritePacketFn>,
    _seek: Option<SeekFn>,
) -> *mut AvIoContext {
    if take_failure(Failure::AllocIoContext) {
        return ptr::null_mut();
    }
    let io = libc::malloc(mem::size_of::<FakeIo>()) as *mut FakeIo;
    if io.is_null() {
        return ptr::null_mut();
    }
    io.write(FakeIo {
        ctx: AvIoContext {
            av_class: ptr::null(),
            buffer,
            buffer_size,
        },
        opaque,
        read,
    });
    with_state(|state| state.live += 1);
    io as *mut AvIoContext
}

unsafe fn fail_open(ps: *mut *mut AvFormatContext, code: c_int) -> c_int {
    release_format(ps);
    code
}

/// Pull the whole input through the installed read callback.
unsafe fn drain(io: *mut FakeIo) -> Option<Vec<u8>> {
    let read = (*io).read?;

    if with_state(|state| mem::take(&mut state.grow_io_buffer)) {
        let size = (*io).ctx.buffer_size * 2;
        let grown = malloc(size as size_t) as *mut c_uchar;
        if grown.is_null() {
            return None;
        }
        free((*io).ctx.buffer as *mut c_void);
        (*io).ctx.buffer = grown;
        (*io).ctx.buffer_size = size;
    }

    let mut data = Vec::new();
    loop {
        let got = read((*io).opaque, (*io).ctx.buffer, (*io).ctx.buffer_size);
        if got <= 0 {
            with_state(|state| state.reads.calls_after_eof += 1);
            return Some(data);
        }
        let got = got as usize;
        data.extend_from_slice(std::slice::from_raw_parts((*io).ctx.buffer, got));
        with_state(|state| {
            state.reads.total += got;
            state.reads.largest = state.reads.largest.max(got);
        });
    }
}

unsafe extern "C" fn open_input(
    ps: *mut *mut AvFormatContext,
    url: *const c_char,
    _fmt: *mut c_void,
    _options: *mut *mut c_void,
) -> c_int {
    if ps.is_null() || (*ps).is_null() {
        return -libc::EINVAL;
    }
    let ctx = *ps;

    let container = if url.is_null() {
        let io = (*ctx).pb as *mut FakeIo;
        if io.is_null() {
            return fail_open(ps, -libc::EINVAL);
        }
        let Some(data) = drain(io) else {
            return fail_open(ps, -libc::ENOMEM);
        };
        let accepted = with_state(|state| {
            state
                .buffers
                .as_ref()
                .filter(|(magic, _)| data.starts_with(magic))
                .map(|(_, container)| container.clone())
        });
        match accepted {
            Some(container) => container,
            None => return fail_open(ps, AVERROR_INVALIDDATA),
        }
    } else {
        let path = CStr::from_ptr(url).to_string_lossy().into_owned();
        match with_state(|state| state.files.get(&path).cloned()) {
            Some(container) => container,
            None => return fail_open(ps, -libc::ENOENT),
        }
    };

    let format = &mut *(ctx as *mut FakeFormat);
    let mut opened = Opened::build(&container);
    format.ctx.iformat = opened
        .format
        .as_deref()
        .map_or(ptr::null(), |f| f as *const AvInputFormat);
    format.ctx.nb_streams = opened.stream_ptrs.len() as c_uint;
    format.ctx.streams = opened.stream_ptrs.as_mut_ptr();
    format.ctx.duration = container.duration;
    format.opened = Some(opened);
    0
}

unsafe fn opened<'a>(ic: *mut AvFormatContext) -> Option<&'a Opened> {
    if ic.is_null() {
        return None;
    }
    (*(ic as *mut FakeFormat)).opened.as_deref()
}

unsafe extern "C" fn find_stream_info(ic: *mut AvFormatContext, _options: *mut *mut c_void) -> c_int {
    match opened(ic) {
        Some(opened) => opened.find_info_result,
        None => -libc::EINVAL,
    }
}

unsafe extern "C" fn find_best_stream(
    ic: *mut AvFormatContext,
    media_type: c_int,
    _wanted_stream_nb: c_int,
    _related_stream: c_int,
    decoder_ret: *mut *const AvCodec,
    _flags: c_int,
) -> c_int {
    let Some(opened) = opened(ic) else {
        return -libc::EINVAL;
    };
    let index = match media_type {
        MEDIA_TYPE_VIDEO => opened.video,
        MEDIA_TYPE_AUDIO => opened.audio,
        _ => None,
    };
    let Some(index) = index else {
        return AVERROR_STREAM_NOT_FOUND;
    };
    if !decoder_ret.is_null() {
        *decoder_ret = &*opened.codecs[index as usize];
    }
    index
}

unsafe extern "C" fn error_to_string(errnum: c_int, errbuf: *mut c_char, errbuf_size: size_t) -> c_int {
    let text: &[u8] = match errnum {
        AVERROR_INVALIDDATA => b"Invalid data found when processing input",
        AVERROR_STREAM_NOT_FOUND => b"Stream not found",
        e if e == -libc::ENOENT => b"No such file or directory",
        _ => return -1,
    };
    if errbuf.is_null() || errbuf_size == 0 {
        return -1;
    }
    let len = text.len().min(errbuf_size - 1);
    ptr::copy_nonoverlapping(text.as_ptr() as *const c_char, errbuf, len);
    *errbuf.add(len) = 0;
    0
}
