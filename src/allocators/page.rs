//! Pages - zero-initialised blocks of bump-allocated storage.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::api::error::LifetimeError;

/// Alignment of every page's base address.
pub(crate) const PAGE_ALIGN: usize = 16;

/// A contiguous block of storage owned by exactly one lifetime.
///
/// `used` only grows between resets and never exceeds `capacity`.
pub(crate) struct Page {
    /// Base pointer of the page
    base: NonNull<u8>,

    /// Bytes handed out so far
    used: usize,

    /// Total capacity in bytes
    capacity: usize,
}

impl Page {
    /// Create a new zeroed page with the given capacity.
    ///
    /// Failure to obtain memory from the system aborts the process.
    pub fn new(capacity: usize) -> Result<Self, LifetimeError> {
        let capacity = capacity.max(1);
        let layout = Self::layout(capacity)?;

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(base) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        Ok(Self {
            base,
            used: 0,
            capacity,
        })
    }

    fn layout(capacity: usize) -> Result<Layout, LifetimeError> {
        Layout::from_size_align(capacity, PAGE_ALIGN)
            .map_err(|_| LifetimeError::SizeOverflow { requested: capacity })
    }

    /// Bytes still free in this page.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Bytes handed out since the last reset.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Address of the first free byte.
    #[inline]
    pub fn cursor(&self) -> *mut u8 {
        // SAFETY: used <= capacity, so this is at most one past the end
        unsafe { self.base.as_ptr().add(self.used) }
    }

    /// Mark `bytes` more bytes as used.
    #[inline]
    pub fn advance(&mut self, bytes: usize) {
        assert!(bytes <= self.available(), "page overrun");
        self.used += bytes;
    }

    /// Zero the used region and make the whole page available again.
    pub fn reset(&mut self) {
        // SAFETY: the first `used` bytes lie inside our allocation
        unsafe {
            std::ptr::write_bytes(self.base.as_ptr(), 0, self.used);
        }
        self.used = 0;
    }

    /// Whether `addr` falls inside this page's storage.
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.base.as_ptr() as usize;
        addr >= start && addr < start + self.capacity
    }
}

// SAFETY: a page exclusively owns its block; nothing else aliases `base`.
unsafe impl Send for Page {}

impl Drop for Page {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.capacity) {
            // SAFETY: we allocated this memory in `new()` with the same layout
            unsafe {
                dealloc(self.base.as_ptr(), layout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_is_zeroed() {
        let page = Page::new(256).unwrap();
        assert_eq!(page.used(), 0);
        assert_eq!(page.available(), 256);
        assert_eq!(page.cursor() as usize % PAGE_ALIGN, 0);

        let bytes = unsafe { std::slice::from_raw_parts(page.cursor(), 256) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reset_zeroes_used_region() {
        let mut page = Page::new(64).unwrap();
        unsafe { std::ptr::write_bytes(page.cursor(), 0xAB, 32) };
        page.advance(32);
        assert_eq!(page.available(), 32);

        page.reset();
        assert_eq!(page.used(), 0);
        let bytes = unsafe { std::slice::from_raw_parts(page.cursor(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "page overrun")]
    fn test_advance_past_capacity() {
        let mut page = Page::new(16).unwrap();
        page.advance(17);
    }

    #[test]
    fn test_oversized_page_is_rejected() {
        assert!(matches!(
            Page::new(usize::MAX),
            Err(LifetimeError::SizeOverflow { .. })
        ));
    }
}
