//! The allocator state object.
//!
//! [`AllocatorState`] owns the arena pool, the explicit lifetime registry and
//! the ambient context. Every operation returns a `Result`; the handle types
//! in `api` turn errors into fatal diagnostics.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::allocators::arena::ArenaPool;
use crate::allocators::header::{AllocHeader, HEADER_SIZE};
use crate::api::config::AllocConfig;
use crate::api::error::LifetimeError;
use crate::api::lifetime::Lifetime;
use crate::api::stats::{AllocStats, Counters, LifetimeStats};
use crate::core::context::AmbientContext;
use crate::core::registry::ExplicitRegistry;
use crate::util::layout::{is_valid_alignment, padding_for};

/// All mutable state of one lifetime allocator.
///
/// Single-threaded: there is no internal synchronization. Wrap it in one lock
/// to share it (see `SharedLifetimeAlloc`).
pub struct AllocatorState {
    config: AllocConfig,
    pool: ArenaPool,
    registry: ExplicitRegistry,
    context: AmbientContext,
    counters: Counters,
}

impl AllocatorState {
    /// Create a new state with the given configuration.
    ///
    /// No page is allocated until the first allocation.
    pub fn new(config: AllocConfig) -> Self {
        let config = config.sanitized();
        Self {
            pool: ArenaPool::new(config.lifetime_count(), config.page_size),
            registry: ExplicitRegistry::new(config.max_explicit_lifetimes),
            context: AmbientContext::new(config.ambient_stack_depth),
            counters: Counters::default(),
            config,
        }
    }

    /// Storage needed to place an `AllocatorState` in caller-provided memory.
    pub fn storage_layout() -> Layout {
        Layout::new::<Self>()
    }

    /// Get the configuration.
    pub fn config(&self) -> &AllocConfig {
        &self.config
    }

    /// Allocate `num_bytes` in `lifetime`, optionally aligned.
    ///
    /// The payload is preceded by an [`AllocHeader`]. `alignment` of `None`
    /// or `Some(0)` leaves the payload unaligned.
    pub fn allocate_bytes(
        &mut self,
        num_bytes: usize,
        lifetime: Lifetime,
        alignment: Option<usize>,
    ) -> Result<NonNull<u8>, LifetimeError> {
        let align = alignment.unwrap_or(0);
        if !is_valid_alignment(align) {
            return Err(LifetimeError::InvalidAlignment(align));
        }
        if !self.is_live(lifetime) {
            return Err(LifetimeError::NotLive(lifetime));
        }

        let overflow = LifetimeError::SizeOverflow { requested: num_bytes };
        let desired = HEADER_SIZE.checked_add(num_bytes).ok_or(overflow)?;
        let worst_case = desired.checked_add(align).ok_or(overflow)?;

        let page = self.pool.find_or_create_page(lifetime, worst_case)?;
        let start = page.cursor();
        let padding = padding_for(start as usize + HEADER_SIZE, align);
        assert!(align == 0 || padding < align, "alignment padding out of range");

        let consumed = desired + padding;
        page.advance(consumed);

        // SAFETY: [start, start + consumed) was just reserved in the page, and
        // the payload begins after padding and header inside that range.
        let payload = unsafe {
            let payload = NonNull::new_unchecked(start.add(padding + HEADER_SIZE));
            AllocHeader::new(num_bytes, lifetime).write_before(payload);
            payload
        };

        self.record(|c| c.record_alloc(consumed));
        Ok(payload)
    }

    /// Realloc-shaped entry point for code that knows nothing about lifetimes.
    ///
    /// `None` allocates in the ambient lifetime. An existing allocation grows
    /// in the lifetime recorded in its header, whatever is ambient now, and
    /// its first `min(old, new)` bytes are copied. Both use the ambient
    /// alignment. The old block is abandoned until its lifetime is reset;
    /// there is no per-allocation free.
    ///
    /// # Safety
    ///
    /// `ptr`, if given, must have been returned by this state and its
    /// lifetime must not have been reset since.
    pub unsafe fn reallocate_for_foreign(
        &mut self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Result<NonNull<u8>, LifetimeError> {
        let alignment = self.context.alignment();
        let (lifetime, old_size) = match ptr {
            Some(old) => {
                let header = AllocHeader::read_before(old);
                (header.lifetime, header.payload_size())
            }
            None => (self.context.lifetime(), 0),
        };

        let fresh = self.allocate_bytes(new_size, lifetime, Some(alignment))?;

        if let Some(old) = ptr {
            let count = old_size.min(new_size);
            std::ptr::copy_nonoverlapping(old.as_ptr(), fresh.as_ptr(), count);
            self.record(|c| c.record_realloc(HEADER_SIZE + old_size));
        }
        Ok(fresh)
    }

    /// Zero every page of `lifetime` and make it reusable.
    ///
    /// Every pointer previously returned for `lifetime` becomes dangling.
    pub fn free_pages(&mut self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        let released = self.pool.reset(lifetime)?;
        self.record(|c| c.record_reset(released));
        Ok(())
    }

    /// Check out the lowest free explicit lifetime.
    pub fn lifetime_begin(&mut self) -> Result<Lifetime, LifetimeError> {
        self.registry.begin()
    }

    /// Where each checked-out explicit lifetime was begun.
    #[cfg(feature = "debug")]
    pub(crate) fn describe_checkouts(&self) -> String {
        self.registry.describe_checkouts()
    }

    /// Reclaim an explicit lifetime's pages and return its slot to the pool.
    ///
    /// Refused while `lifetime` is still pushed on the ambient stack.
    pub fn lifetime_end(&mut self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        let slot = self.registry.check_active(lifetime)?;
        if self.context.holds_lifetime(lifetime) {
            return Err(LifetimeError::StillAmbient(lifetime));
        }
        self.free_pages(lifetime)?;
        self.registry.release(slot);
        Ok(())
    }

    pub fn push_lifetime(&mut self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        self.context.push_lifetime(lifetime)
    }

    pub fn pop_lifetime(&mut self) -> Result<Lifetime, LifetimeError> {
        self.context.pop_lifetime()
    }

    /// Pop the lifetime a scope pushed at `depth`.
    pub fn pop_lifetime_at(&mut self, depth: usize) -> Result<Lifetime, LifetimeError> {
        self.context.pop_lifetime_at(depth)
    }

    pub fn push_alignment(&mut self, align: usize) -> Result<(), LifetimeError> {
        self.context.push_alignment(align)
    }

    pub fn pop_alignment(&mut self) -> Result<usize, LifetimeError> {
        self.context.pop_alignment()
    }

    /// Pop the alignment a scope pushed at `depth`.
    pub fn pop_alignment_at(&mut self, depth: usize) -> Result<usize, LifetimeError> {
        self.context.pop_alignment_at(depth)
    }

    /// Outstanding pushes on the (lifetime, alignment) stacks.
    pub fn ambient_depths(&self) -> (usize, usize) {
        self.context.depths()
    }

    /// Lifetime on top of the ambient stack.
    pub fn ambient_lifetime(&self) -> Lifetime {
        self.context.lifetime()
    }

    /// Alignment on top of the ambient stack (0 = none).
    pub fn ambient_alignment(&self) -> usize {
        self.context.alignment()
    }

    /// Whether `lifetime` is an explicit lifetime currently checked out.
    pub fn is_active(&self, lifetime: Lifetime) -> bool {
        self.registry.is_active(lifetime)
    }

    /// Whether allocations into `lifetime` are currently allowed.
    pub fn is_live(&self, lifetime: Lifetime) -> bool {
        self.pool.contains(lifetime) && (!lifetime.is_explicit() || self.registry.is_active(lifetime))
    }

    /// How many times `lifetime` has been reset.
    pub fn reset_epoch(&self, lifetime: Lifetime) -> u64 {
        self.pool.epoch(lifetime)
    }

    /// Which lifetime's pages contain `addr`.
    pub fn owner_of(&self, addr: usize) -> Option<Lifetime> {
        self.pool.owner_of(addr)
    }

    /// Get current statistics.
    pub fn stats(&self) -> AllocStats {
        let mut stats = AllocStats {
            allocation_count: self.counters.allocation_count,
            realloc_count: self.counters.realloc_count,
            abandoned_bytes: self.counters.abandoned_bytes,
            peak_bytes: self.counters.peak_bytes,
            active_explicit_lifetimes: self.registry.active_count(),
            ..Default::default()
        };

        for index in 0..self.pool.lifetime_count() {
            let lifetime = Lifetime::from_index(index);
            let Some(list) = self.pool.list(lifetime) else {
                continue;
            };
            if list.page_count() == 0 {
                continue;
            }

            let life = LifetimeStats {
                lifetime,
                used_bytes: list.used_bytes(),
                capacity_bytes: list.capacity_bytes(),
                page_count: list.page_count(),
            };
            stats.used_bytes += life.used_bytes;
            stats.capacity_bytes += life.capacity_bytes;
            stats.page_count += life.page_count;
            stats.lifetimes.push(life);
        }

        stats
    }

    #[inline]
    fn record(&mut self, update: impl FnOnce(&mut Counters)) {
        #[cfg(not(feature = "minimal"))]
        if self.config.collect_stats {
            update(&mut self.counters);
        }
        #[cfg(feature = "minimal")]
        let _ = update;
    }
}

impl Drop for AllocatorState {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        let (lifetimes, alignments) = self.context.depths();
        crate::la_check!(
            lifetimes == 0 && alignments == 0,
            LA201,
            "{} lifetime and {} alignment pushes outstanding",
            lifetimes,
            alignments
        );

        let active = self.registry.active_count();
        crate::la_check!(active == 0, LA102, "{} explicit lifetimes still active", active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AllocatorState {
        AllocatorState::new(AllocConfig::minimal())
    }

    #[test]
    fn test_header_precedes_payload() {
        let mut state = state();
        let ptr = state.allocate_bytes(24, Lifetime::WORLD, None).unwrap();
        let header = unsafe { AllocHeader::read_before(ptr) };
        assert_eq!(header.size, 24);
        assert_eq!(header.lifetime, Lifetime::WORLD);
    }

    #[test]
    fn test_usage_is_exact() {
        let mut state = state();
        state.allocate_bytes(10, Lifetime::FRAME, None).unwrap();
        state.allocate_bytes(6, Lifetime::FRAME, None).unwrap();
        let frame = state.stats().lifetime(Lifetime::FRAME).cloned().unwrap();
        assert_eq!(frame.used_bytes, 2 * HEADER_SIZE + 16);
    }

    #[test]
    fn test_aligned_allocation() {
        let mut state = state();
        // Knock the cursor off any natural alignment first.
        state.allocate_bytes(3, Lifetime::APP, None).unwrap();
        for align in [1, 2, 8, 64, 256] {
            let ptr = state.allocate_bytes(5, Lifetime::APP, Some(align)).unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            let header = unsafe { AllocHeader::read_before(ptr) };
            assert_eq!(header.size, 5);
        }
    }

    #[test]
    fn test_rejects_bad_requests() {
        let mut state = state();
        assert_eq!(
            state.allocate_bytes(8, Lifetime::APP, Some(12)),
            Err(LifetimeError::InvalidAlignment(12))
        );
        assert!(matches!(
            state.allocate_bytes(usize::MAX, Lifetime::APP, None),
            Err(LifetimeError::SizeOverflow { .. })
        ));

        let unused = Lifetime::explicit(0);
        assert_eq!(
            state.allocate_bytes(8, unused, None),
            Err(LifetimeError::NotLive(unused))
        );
    }

    #[test]
    fn test_end_resets_and_frees_slot() {
        let mut state = state();
        let life = state.lifetime_begin().unwrap();
        state.allocate_bytes(100, life, None).unwrap();
        assert!(state.is_live(life));

        state.lifetime_end(life).unwrap();
        assert!(!state.is_live(life));
        assert_eq!(state.stats().lifetime(life).unwrap().used_bytes, 0);
        assert_eq!(state.lifetime_end(life), Err(LifetimeError::NotActive(life)));
    }

    #[test]
    fn test_end_refused_while_ambient() {
        let mut state = state();
        let life = state.lifetime_begin().unwrap();
        state.push_lifetime(life).unwrap();

        assert_eq!(state.lifetime_end(life), Err(LifetimeError::StillAmbient(life)));
        assert!(state.is_live(life));

        state.pop_lifetime().unwrap();
        state.lifetime_end(life).unwrap();
    }

    #[test]
    fn test_exhaustion_is_an_error_under_strict_mode() {
        use crate::diagnostics::strict::{test_lock, StrictModeGuard};

        let _lock = test_lock();
        let _strict = StrictModeGuard::panic_on_error();
        let mut state = AllocatorState::new(AllocConfig::minimal().with_max_explicit_lifetimes(1));
        let life = state.lifetime_begin().unwrap();
        assert_eq!(
            state.lifetime_begin(),
            Err(LifetimeError::ExplicitExhausted { capacity: 1 })
        );
        state.lifetime_end(life).unwrap();
    }

    #[test]
    fn test_realloc_copies_and_counts_waste() {
        let mut state = state();
        let old = state.allocate_bytes(4, Lifetime::WORLD, None).unwrap();
        unsafe { std::ptr::copy_nonoverlapping([1u8, 2, 3, 4].as_ptr(), old.as_ptr(), 4) };

        let grown = unsafe { state.reallocate_for_foreign(Some(old), 8).unwrap() };
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 8) };
        assert_eq!(bytes, &[1, 2, 3, 4, 0, 0, 0, 0]);

        let shrunk = unsafe { state.reallocate_for_foreign(Some(grown), 2).unwrap() };
        let bytes = unsafe { std::slice::from_raw_parts(shrunk.as_ptr(), 2) };
        assert_eq!(bytes, &[1, 2]);

        if cfg!(not(feature = "minimal")) {
            let stats = state.stats();
            assert_eq!(stats.realloc_count, 2);
            assert_eq!(stats.abandoned_bytes, 2 * HEADER_SIZE + 4 + 8);
        }
    }

    #[test]
    fn test_realloc_uses_ambient_alignment() {
        let mut state = state();
        state.allocate_bytes(1, Lifetime::FRAME, None).unwrap();
        state.push_lifetime(Lifetime::FRAME).unwrap();
        state.push_alignment(32).unwrap();

        let ptr = unsafe { state.reallocate_for_foreign(None, 16).unwrap() };
        assert_eq!(ptr.as_ptr() as usize % 32, 0);
        assert_eq!(state.owner_of(ptr.as_ptr() as usize), Some(Lifetime::FRAME));

        state.pop_alignment().unwrap();
        state.pop_lifetime().unwrap();
    }

    #[test]
    fn test_stats_disabled() {
        let mut state = AllocatorState::new(AllocConfig::minimal().with_stats(false));
        state.allocate_bytes(8, Lifetime::APP, None).unwrap();
        let stats = state.stats();
        assert_eq!(stats.allocation_count, 0);
        assert_eq!(stats.used_bytes, HEADER_SIZE + 8);
    }
}
