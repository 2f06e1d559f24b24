//! Growable arrays backed by the foreign realloc path.
//!
//! A [`LifeVec`] does not track lifetimes itself. Its first allocation lands
//! in whatever lifetime the caller names; every later growth goes through
//! [`LifetimeAlloc::reallocate_for_foreign`], which keeps the block in the
//! lifetime recorded in its header.
//!
//! # Thread Safety
//!
//! `LifeVec` borrows a [`LifetimeAlloc`], so it is `!Send` and `!Sync`.

use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crate::api::alloc::LifetimeAlloc;
use crate::api::error::LifetimeError;
use crate::api::lifetime::Lifetime;

const MIN_CAPACITY: usize = 4;

#[derive(Clone, Copy)]
struct Buffer<T> {
    ptr: NonNull<T>,
    lifetime: Lifetime,
    /// Reset epoch of `lifetime` when the buffer was obtained.
    epoch: u64,
}

/// A growable array of `Copy` values living in a lifetime arena.
///
/// Nothing is ever freed: growing abandons the old storage until its lifetime
/// is reset. Once that happens the vector is stale, and any further use is a
/// fatal error (`LA004`).
///
/// # Example
///
/// ```rust
/// use lifealloc::{LifeVec, LifetimeAlloc, Lifetime};
///
/// let alloc = LifetimeAlloc::with_defaults();
/// let mut hits = LifeVec::new_in(&alloc);
/// for i in 0..100u32 {
///     hits.push(i, Lifetime::FRAME);
/// }
/// assert_eq!(hits.lifetime(), Some(Lifetime::FRAME));
/// assert_eq!(hits[99], 99);
/// ```
pub struct LifeVec<'a, T: Copy> {
    alloc: &'a LifetimeAlloc,
    buf: Option<Buffer<T>>,
    len: usize,
    capacity: usize,
}

impl<'a, T: Copy> LifeVec<'a, T> {
    /// Create an empty vector. Nothing is allocated until the first push.
    pub fn new_in(alloc: &'a LifetimeAlloc) -> Self {
        Self {
            alloc,
            buf: None,
            len: 0,
            capacity: 0,
        }
    }

    /// Append `value`, growing the storage if needed.
    ///
    /// `life_for_first_alloc` only matters when the vector has no storage
    /// yet; afterwards growth stays in the lifetime of the first block.
    pub fn push(&mut self, value: T, life_for_first_alloc: Lifetime) {
        self.reserve(1, life_for_first_alloc);
        let Some(buf) = self.live_buffer() else {
            unreachable_empty();
        };
        // SAFETY: reserve guaranteed len < capacity, and the buffer is live.
        unsafe { buf.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Set the length to `new_len`, filling new slots with `T::default()`.
    pub fn resize(&mut self, new_len: usize, life_for_first_alloc: Lifetime)
    where
        T: Default,
    {
        if new_len <= self.len {
            self.len = new_len;
            return;
        }
        self.reserve(new_len - self.len, life_for_first_alloc);
        let Some(buf) = self.live_buffer() else {
            // Zero-length growth of an empty vector.
            return;
        };
        for i in self.len..new_len {
            // SAFETY: i < capacity after reserve.
            unsafe { buf.ptr.as_ptr().add(i).write(T::default()) };
        }
        self.len = new_len;
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let buf = self.live_buffer()?;
        self.len -= 1;
        // SAFETY: the slot at the old `len - 1` was initialized.
        Some(unsafe { buf.ptr.as_ptr().add(self.len).read() })
    }

    /// Drop every element but keep the storage.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The lifetime the storage was first allocated in, read from its header.
    pub fn lifetime(&self) -> Option<Lifetime> {
        let buf = self.live_buffer()?;
        // SAFETY: live_buffer checked the lifetime has not been reset.
        Some(unsafe { self.alloc.header_of(buf.ptr.cast()) }.lifetime)
    }

    pub fn as_slice(&self) -> &[T] {
        match self.live_buffer() {
            // SAFETY: the first `len` slots are initialized and live.
            Some(buf) => unsafe { slice::from_raw_parts(buf.ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.live_buffer() {
            // SAFETY: as above; `&mut self` makes the access unique.
            Some(buf) => unsafe { slice::from_raw_parts_mut(buf.ptr.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Make room for `additional` more elements.
    fn reserve(&mut self, additional: usize, life_for_first_alloc: Lifetime) {
        let Some(needed) = self.len.checked_add(additional) else {
            LifetimeError::SizeOverflow { requested: usize::MAX }.raise();
        };
        if needed <= self.capacity {
            return;
        }

        let new_capacity = needed
            .max(self.capacity.saturating_mul(2))
            .max(MIN_CAPACITY);
        let Some(bytes) = size_of::<T>().checked_mul(new_capacity) else {
            LifetimeError::SizeOverflow { requested: usize::MAX }.raise();
        };

        let old = self.live_buffer().map(|buf| buf.ptr.cast::<u8>());
        let ptr = {
            let _life = self.alloc.lifetime_scope(life_for_first_alloc);
            let _align = self.alloc.alignment_scope(align_of::<T>());
            // SAFETY: `old` came from this allocator and live_buffer
            // checked its lifetime has not been reset.
            unsafe { self.alloc.reallocate_for_foreign(old, bytes) }
        };

        // SAFETY: `ptr` was just returned by the allocator.
        let lifetime = unsafe { self.alloc.header_of(ptr) }.lifetime;
        self.buf = Some(Buffer {
            ptr: ptr.cast(),
            lifetime,
            epoch: self.alloc.reset_epoch(lifetime),
        });
        self.capacity = new_capacity;
    }

    /// The storage, if any. Fatal if its lifetime was reset since.
    fn live_buffer(&self) -> Option<Buffer<T>> {
        let buf = self.buf?;
        if self.alloc.reset_epoch(buf.lifetime) != buf.epoch {
            LifetimeError::Stale(buf.lifetime).raise();
        }
        Some(buf)
    }
}

#[cold]
fn unreachable_empty() -> ! {
    crate::diagnostics::emit::fatal(&crate::diagnostics::LA901, &"LifeVec has no storage after reserve")
}

impl<'a, T: Copy> Deref for LifeVec<'a, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'a, T: Copy> DerefMut for LifeVec<'a, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T: Copy + std::fmt::Debug> std::fmt::Debug for LifeVec<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::AllocConfig;

    #[test]
    fn test_push_and_read_back() {
        let alloc = LifetimeAlloc::new(AllocConfig::minimal());
        let mut v = LifeVec::new_in(&alloc);
        for i in 0..1000u64 {
            v.push(i * 3, Lifetime::WORLD);
        }
        assert_eq!(v.len(), 1000);
        assert!(v.iter().enumerate().all(|(i, &x)| x == i as u64 * 3));
        assert_eq!(v.as_ptr() as usize % align_of::<u64>(), 0);
        assert_eq!(v.pop(), Some(2997));
    }

    #[test]
    fn test_growth_stays_in_first_lifetime() {
        let alloc = LifetimeAlloc::new(AllocConfig::minimal());
        let mut v = LifeVec::new_in(&alloc);
        v.push(1u32, Lifetime::FRAME);

        // Later pushes name another lifetime, and another one is ambient.
        let _scope = alloc.lifetime_scope(Lifetime::APP);
        for i in 0..64 {
            v.push(i, Lifetime::WORLD);
        }
        assert_eq!(v.lifetime(), Some(Lifetime::FRAME));
        assert_eq!(alloc.owner_of(v.as_ptr().cast()), Some(Lifetime::FRAME));
        assert_eq!(alloc.ambient_lifetime(), Lifetime::APP);
    }

    #[test]
    fn test_resize_fills_with_default() {
        let alloc = LifetimeAlloc::new(AllocConfig::minimal());
        let mut v = LifeVec::new_in(&alloc);
        v.push(7i32, Lifetime::APP);
        v.resize(5, Lifetime::APP);
        assert_eq!(v.as_slice(), &[7, 0, 0, 0, 0]);
        v.resize(2, Lifetime::APP);
        assert_eq!(v.as_slice(), &[7, 0]);
        assert!(v.capacity() >= 5);
    }

    #[test]
    fn test_empty_vec_allocates_nothing() {
        let alloc = LifetimeAlloc::new(AllocConfig::minimal());
        let mut v = LifeVec::<u8>::new_in(&alloc);
        v.resize(0, Lifetime::FRAME);
        assert!(v.is_empty());
        assert_eq!(v.lifetime(), None);
        assert_eq!(alloc.stats().page_count, 0);
    }

    #[test]
    #[should_panic(expected = "LA004")]
    fn test_use_after_reset_is_fatal() {
        let alloc = LifetimeAlloc::new(AllocConfig::minimal());
        let mut v = LifeVec::new_in(&alloc);
        v.push(1u8, Lifetime::FRAME);
        alloc.end_frame();
        let _ = v.as_slice();
    }
}
