//! In-memory input for the native demuxer.
//!
//! The native library pulls container bytes through a read callback. For
//! buffer probes that callback is [`read_packet`], and its opaque argument is
//! a [`BufferCursor`] over the caller's slice.

use libc::{c_int, c_void};

/// Read position over an immutable byte slice.
///
/// The position only moves forward and never past the end of the slice.
#[derive(Debug, Clone)]
pub struct BufferCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BufferCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// Copy up to `dest.len()` bytes into `dest` and advance past them.
    ///
    /// Returns the number of bytes copied; 0 means end of input.
    pub fn read_into(&mut self, dest: &mut [u8]) -> usize {
        let count = dest.len().min(self.remaining());
        dest[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        count
    }
}

/// Read callback handed to the native I/O context.
///
/// Returns 0 at end of input, and also for a null cursor, a null
/// destination or a negative size.
///
/// # Safety
///
/// `opaque` must be null or point to a live [`BufferCursor`] not aliased
/// elsewhere for the duration of the call, and `buf` must be null or
/// writable for `buf_size` bytes.
pub unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    if opaque.is_null() || buf.is_null() || buf_size <= 0 {
        return 0;
    }

    let cursor = &mut *(opaque as *mut BufferCursor<'_>);
    let dest = std::slice::from_raw_parts_mut(buf, buf_size as usize);

    // Never larger than `buf_size`, so it fits back into a c_int.
    cursor.read_into(dest) as c_int
}
