//! Native resources owned by one probe call.

use crate::ffi::{self, AvCodec, AvFormatContext, AvIoContext, FormatView};
use crate::reader::{read_packet, BufferCursor};
use crate::symbols::SymbolTable;
use crate::{Error, Result};
use libc::{c_int, c_void};
use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr;
use tracing::{debug, trace};

/// Stream picked by best-stream selection.
pub(crate) struct Selected<'s> {
    pub index: c_int,
    pub decoder: Option<ffi::CodecView<'s>>,
}

/// Format context plus the optional in-memory reader attached to it.
///
/// Dropping the session releases, in order: the format context, the I/O
/// context's current buffer (or the staging buffer if no I/O context took
/// it over), the I/O context, and the cursor.
pub(crate) struct Session<'a> {
    table: &'a SymbolTable,
    format: *mut AvFormatContext,
    io: *mut AvIoContext,
    staging: *mut c_void,
    cursor: *mut BufferCursor<'a>,
    _data: PhantomData<&'a [u8]>,
}

impl<'a> Session<'a> {
    /// Allocate an empty format context.
    pub fn alloc(table: &'a SymbolTable) -> Result<Self> {
        // SAFETY: no preconditions.
        let format = unsafe { (table.alloc_context)() };
        if format.is_null() {
            return Err(Error::alloc("format context"));
        }
        trace!("Allocated format context");

        Ok(Self {
            table,
            format,
            io: ptr::null_mut(),
            staging: ptr::null_mut(),
            cursor: ptr::null_mut(),
            _data: PhantomData,
        })
    }

    /// Install a read callback over `data` as the context's I/O.
    ///
    /// Must be called before [`Session::open`].
    pub fn attach_reader(&mut self, data: &'a [u8], buffer_size: usize) -> Result<()> {
        let size = c_int::try_from(buffer_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| Error::input_failure(format!("invalid I/O buffer size {buffer_size}")))?;

        // SAFETY: no preconditions.
        self.staging = unsafe { (self.table.malloc)(buffer_size) };
        if self.staging.is_null() {
            return Err(Error::alloc("I/O staging buffer"));
        }

        self.cursor = Box::into_raw(Box::new(BufferCursor::new(data)));

        // SAFETY: the staging buffer is `size` bytes long; the cursor stays
        // alive until after the I/O context is released in `drop`.
        let io = unsafe {
            (self.table.alloc_io_context)(
                self.staging as *mut u8,
                size,
                0,
                self.cursor as *mut c_void,
                Some(read_packet),
                None,
                None,
            )
        };
        if io.is_null() {
            return Err(Error::alloc("I/O context"));
        }

        // The I/O context owns the staging buffer from here on.
        self.io = io;
        self.staging = ptr::null_mut();
        // SAFETY: `format` is a live, not yet opened context.
        unsafe { (*self.format).pb = io };
        debug!("Attached in-memory reader over {} bytes", data.len());
        Ok(())
    }

    /// Open the container, from `url` or from the attached reader.
    pub fn open(&mut self, url: Option<&CStr>) -> Result<()> {
        let url = url.map_or(ptr::null(), CStr::as_ptr);
        // SAFETY: `format` is live; on failure the library frees it and nulls
        // the slot we hand it.
        let ret =
            unsafe { (self.table.open_input)(&mut self.format, url, ptr::null_mut(), ptr::null_mut()) };
        if ret < 0 {
            self.format = ptr::null_mut();
            return Err(self.table.native_error(ret));
        }
        Ok(())
    }

    /// View of the opened container.
    pub fn view(&self) -> Result<FormatView<'_>> {
        // SAFETY: the context stays open while `self` is borrowed.
        unsafe { FormatView::from_ptr(self.format) }.ok_or(Error::FormatNotAvailable)
    }

    /// Read packets to fill in stream parameters.
    pub fn find_stream_info(&mut self) -> Result<()> {
        // SAFETY: `format` is open.
        let ret = unsafe { (self.table.find_stream_info)(self.format, ptr::null_mut()) };
        if ret < 0 {
            return Err(self.table.native_error(ret));
        }
        Ok(())
    }

    /// Best stream of `media_type`, or the negative native code.
    pub fn find_best_stream(&self, media_type: c_int) -> std::result::Result<Selected<'_>, i32> {
        let mut decoder: *const AvCodec = ptr::null();
        // SAFETY: `format` is open; `decoder` receives a static descriptor.
        let index = unsafe {
            (self.table.find_best_stream)(self.format, media_type, -1, -1, &mut decoder, 0)
        };
        if index < 0 {
            return Err(index);
        }
        Ok(Selected {
            index,
            // SAFETY: null or a descriptor owned by the library.
            decoder: unsafe { ffi::CodecView::from_ptr(decoder) },
        })
    }

    pub fn table(&self) -> &SymbolTable {
        self.table
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // SAFETY: each pointer is either null or exclusively owned by this
        // session, and each is released once.
        unsafe {
            if !self.format.is_null() {
                (self.table.close_input)(&mut self.format);
                trace!("Closed format context");
            }

            // Closing does not release a caller-installed I/O context.
            if !self.io.is_null() {
                let buffer = (*self.io).buffer;
                if !buffer.is_null() {
                    (self.table.free)(buffer as *mut c_void);
                }
                (self.table.free)(self.io as *mut c_void);
                self.io = ptr::null_mut();
                trace!("Released I/O context");
            } else if !self.staging.is_null() {
                (self.table.free)(self.staging);
                self.staging = ptr::null_mut();
            }

            if !self.cursor.is_null() {
                drop(Box::from_raw(self.cursor));
                self.cursor = ptr::null_mut();
            }
        }
    }
}
