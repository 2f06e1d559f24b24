//! Thread-safe allocator handle.
//!
//! One lock guards the whole state, ambient stacks included. Pushes made by
//! one thread are visible to every other thread until popped.

use std::ptr::NonNull;
use std::sync::Arc;

use crate::api::config::AllocConfig;
use crate::api::error::{LifetimeError, OrRaise};
use crate::api::lifetime::Lifetime;
use crate::api::stats::AllocStats;
use crate::core::state::AllocatorState;
use crate::sync::mutex::Mutex;

/// A [`LifetimeAlloc`](crate::LifetimeAlloc) that can be shared across threads.
///
/// Cheap to clone (internally uses `Arc`). Every call takes the global lock
/// once; use [`with_state`](Self::with_state) to batch several operations
/// under a single acquisition.
#[derive(Clone)]
pub struct SharedLifetimeAlloc {
    inner: Arc<Mutex<AllocatorState>>,
}

impl SharedLifetimeAlloc {
    /// Create a new shared allocator.
    pub fn new(config: AllocConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AllocatorState::new(config))),
        }
    }

    /// Create a shared allocator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AllocConfig::default())
    }

    /// Run `f` with the state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut AllocatorState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Allocate `num_bytes` in `lifetime`. See
    /// [`LifetimeAlloc::allocate_bytes`](crate::LifetimeAlloc::allocate_bytes).
    pub fn allocate_bytes(&self, num_bytes: usize, lifetime: Lifetime, alignment: Option<usize>) -> NonNull<u8> {
        self.with_state(|s| s.allocate_bytes(num_bytes, lifetime, alignment))
            .or_raise()
    }

    /// Allocate `num_bytes` in the ambient lifetime with the ambient alignment.
    pub fn allocate(&self, num_bytes: usize) -> NonNull<u8> {
        self.with_state(|s| {
            let (lifetime, align) = (s.ambient_lifetime(), s.ambient_alignment());
            s.allocate_bytes(num_bytes, lifetime, Some(align))
        })
        .or_raise()
    }

    /// Realloc-shaped adapter for lifetime-unaware code.
    ///
    /// # Safety
    ///
    /// `ptr`, if given, must have been returned by this allocator and its
    /// lifetime must not have been reset since.
    pub unsafe fn reallocate_for_foreign(&self, ptr: Option<NonNull<u8>>, new_size: usize) -> NonNull<u8> {
        self.with_state(|s| s.reallocate_for_foreign(ptr, new_size))
            .or_raise()
    }

    /// Zero every page of `lifetime` and make them reusable.
    pub fn free_pages(&self, lifetime: Lifetime) {
        self.with_state(|s| s.free_pages(lifetime)).or_raise()
    }

    /// Reclaim the frame lifetime.
    pub fn end_frame(&self) {
        self.free_pages(Lifetime::FRAME);
    }

    /// Check out an explicit lifetime. Fatal if every slot is in use.
    pub fn lifetime_begin(&self) -> Lifetime {
        match self.try_lifetime_begin() {
            Ok(lifetime) => lifetime,
            Err(err) => {
                #[cfg(feature = "debug")]
                crate::la_emit!(LA105, "{}", self.with_state(|s| s.describe_checkouts()));
                err.raise()
            }
        }
    }

    pub fn try_lifetime_begin(&self) -> Result<Lifetime, LifetimeError> {
        self.with_state(AllocatorState::lifetime_begin)
    }

    /// Reclaim an explicit lifetime and free its slot.
    pub fn lifetime_end(&self, lifetime: Lifetime) {
        self.try_lifetime_end(lifetime).or_raise()
    }

    pub fn try_lifetime_end(&self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        self.with_state(|s| s.lifetime_end(lifetime))
    }

    pub fn is_active(&self, lifetime: Lifetime) -> bool {
        self.with_state(|s| s.is_active(lifetime))
    }

    pub fn push_api_lifetime(&self, lifetime: Lifetime) {
        self.with_state(|s| s.push_lifetime(lifetime)).or_raise()
    }

    pub fn pop_api_lifetime(&self) -> Lifetime {
        self.with_state(AllocatorState::pop_lifetime).or_raise()
    }

    pub fn push_api_alignment(&self, align: usize) {
        self.with_state(|s| s.push_alignment(align)).or_raise()
    }

    pub fn pop_api_alignment(&self) -> usize {
        self.with_state(AllocatorState::pop_alignment).or_raise()
    }

    /// Get current allocation statistics.
    pub fn stats(&self) -> AllocStats {
        self.with_state(|s| s.stats())
    }
}
