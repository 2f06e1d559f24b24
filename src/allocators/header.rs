//! The allocation header written in front of every payload.

use std::ptr::NonNull;

use crate::api::lifetime::Lifetime;

/// Metadata stored immediately before every payload.
///
/// Headers are not necessarily aligned; they are always accessed with
/// unaligned reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AllocHeader {
    /// Requested payload size in bytes.
    pub size: u64,
    /// Lifetime the payload was allocated in.
    pub lifetime: Lifetime,
    _reserved: u32,
}

/// Bytes occupied by a header.
pub const HEADER_SIZE: usize = std::mem::size_of::<AllocHeader>();

impl AllocHeader {
    pub(crate) fn new(size: usize, lifetime: Lifetime) -> Self {
        Self {
            size: size as u64,
            lifetime,
            _reserved: 0,
        }
    }

    /// Payload size as `usize`.
    pub fn payload_size(&self) -> usize {
        self.size as usize
    }

    /// Write this header so that it ends exactly at `payload`.
    ///
    /// # Safety
    ///
    /// The `HEADER_SIZE` bytes before `payload` must be writable.
    pub(crate) unsafe fn write_before(self, payload: NonNull<u8>) {
        let at = payload.as_ptr().sub(HEADER_SIZE) as *mut AllocHeader;
        std::ptr::write_unaligned(at, self);
    }

    /// Read the header preceding `payload`.
    ///
    /// # Safety
    ///
    /// `payload` must have been returned by a lifetime allocator and its
    /// lifetime must not have been reset since.
    pub unsafe fn read_before(payload: NonNull<u8>) -> Self {
        let at = payload.as_ptr().sub(HEADER_SIZE) as *const AllocHeader;
        std::ptr::read_unaligned(at)
    }
}
