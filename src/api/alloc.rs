//! The main allocator type.

use std::cell::{RefCell, RefMut};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::allocators::header::AllocHeader;
use crate::api::config::AllocConfig;
use crate::api::error::{LifetimeError, OrRaise};
use crate::api::lifetime::Lifetime;
use crate::api::scope::{AlignmentScope, ExplicitLifetime, LifetimeScope};
use crate::api::stats::AllocStats;
use crate::core::state::AllocatorState;
use crate::diagnostics;

/// The lifetime allocator.
///
/// Every allocation belongs to a [`Lifetime`] and is reclaimed only when that
/// whole lifetime is reset. There is **no per-allocation free**: callers and
/// the foreign realloc path rely on old blocks simply staying put until
/// their lifetime goes away.
///
/// Cheap to clone (internally uses `Rc`); clones share one state. Not
/// thread-safe; see [`SharedLifetimeAlloc`](crate::SharedLifetimeAlloc) for a
/// locked variant.
///
/// Exhaustion and misuse are fatal: the matching diagnostic is emitted and
/// the call panics. The `try_*` methods report misuse as [`LifetimeError`].
///
/// # Example
///
/// ```rust
/// use lifealloc::{LifetimeAlloc, AllocConfig, Lifetime};
///
/// let alloc = LifetimeAlloc::new(AllocConfig::default());
///
/// // Game loop
/// let scratch = alloc.allocate_array::<f32>(256, Lifetime::FRAME);
/// // ... use scratch ...
/// alloc.end_frame();
/// ```
#[derive(Clone)]
pub struct LifetimeAlloc {
    inner: Rc<RefCell<AllocatorState>>,
}

impl LifetimeAlloc {
    /// Create a new allocator with the given configuration.
    pub fn new(config: AllocConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(AllocatorState::new(config))),
        }
    }

    /// Create an allocator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AllocConfig::default())
    }

    fn state(&self) -> RefMut<'_, AllocatorState> {
        match self.inner.try_borrow_mut() {
            Ok(state) => state,
            Err(_) => diagnostics::emit::fatal(&diagnostics::LA901, &"allocator state already borrowed"),
        }
    }

    /// Whether `other` is a clone of this allocator.
    pub fn same_as(&self, other: &LifetimeAlloc) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ==================== Allocation ====================

    /// Allocate `num_bytes` in `lifetime`.
    ///
    /// `alignment` must be `None`, `Some(0)` or a power of two. The memory is
    /// zeroed the first time a page region is handed out and after every
    /// reset of `lifetime`.
    ///
    /// The returned pointer is valid until `lifetime` is reset (or ended).
    pub fn allocate_bytes(&self, num_bytes: usize, lifetime: Lifetime, alignment: Option<usize>) -> NonNull<u8> {
        self.state().allocate_bytes(num_bytes, lifetime, alignment).or_raise()
    }

    /// Allocate `num_bytes` in the ambient lifetime with the ambient alignment.
    pub fn allocate(&self, num_bytes: usize) -> NonNull<u8> {
        let mut state = self.state();
        let (lifetime, align) = (state.ambient_lifetime(), state.ambient_alignment());
        state.allocate_bytes(num_bytes, lifetime, Some(align)).or_raise()
    }

    /// Allocate space for one `T` in `lifetime`.
    pub fn allocate_elem<T>(&self, lifetime: Lifetime) -> NonNull<T> {
        self.allocate_array::<T>(1, lifetime)
    }

    /// Allocate space for `count` values of `T` in `lifetime`.
    ///
    /// The memory is suitably aligned for `T`.
    pub fn allocate_array<T>(&self, count: usize, lifetime: Lifetime) -> NonNull<T> {
        let Some(num_bytes) = std::mem::size_of::<T>().checked_mul(count) else {
            LifetimeError::SizeOverflow { requested: usize::MAX }.raise();
        };
        self.allocate_bytes(num_bytes, lifetime, Some(std::mem::align_of::<T>()))
            .cast()
    }

    /// Realloc-shaped adapter for code that knows nothing about lifetimes.
    ///
    /// `None` allocates `new_size` bytes in the ambient lifetime. An existing
    /// block is copied into a fresh one in the lifetime it was first
    /// allocated in. The old block is not freed; it is wasted until its
    /// lifetime is reset.
    ///
    /// # Safety
    ///
    /// `ptr`, if given, must have been returned by this allocator and its
    /// lifetime must not have been reset since.
    pub unsafe fn reallocate_for_foreign(&self, ptr: Option<NonNull<u8>>, new_size: usize) -> NonNull<u8> {
        self.state().reallocate_for_foreign(ptr, new_size).or_raise()
    }

    /// Read the header preceding an allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and its lifetime must
    /// not have been reset since.
    pub unsafe fn header_of(&self, ptr: NonNull<u8>) -> AllocHeader {
        AllocHeader::read_before(ptr)
    }

    /// How many times `lifetime` has been reset (or ended).
    ///
    /// Memory obtained from `lifetime` is valid only while this is unchanged.
    pub fn reset_epoch(&self, lifetime: Lifetime) -> u64 {
        self.state().reset_epoch(lifetime)
    }

    /// Which lifetime's pages contain `ptr`, if any.
    pub fn owner_of(&self, ptr: *const u8) -> Option<Lifetime> {
        self.state().owner_of(ptr as usize)
    }

    // ==================== Reclamation ====================

    /// Zero every page of `lifetime` and make them reusable.
    ///
    /// All pointers into `lifetime` become invalid.
    pub fn free_pages(&self, lifetime: Lifetime) {
        self.state().free_pages(lifetime).or_raise()
    }

    /// Reclaim the frame lifetime. Call once per engine tick.
    pub fn end_frame(&self) {
        self.free_pages(Lifetime::FRAME);
    }

    /// Reclaim the world lifetime, e.g. on level unload.
    pub fn reset_world(&self) {
        self.free_pages(Lifetime::WORLD);
    }

    // ==================== Explicit lifetimes ====================

    /// Check out an explicit lifetime. Fatal if every slot is in use.
    pub fn lifetime_begin(&self) -> Lifetime {
        match self.try_lifetime_begin() {
            Ok(lifetime) => lifetime,
            Err(err) => {
                #[cfg(feature = "debug")]
                crate::la_emit!(LA105, "{}", self.state().describe_checkouts());
                err.raise()
            }
        }
    }

    /// Check out an explicit lifetime, reporting exhaustion as an error.
    pub fn try_lifetime_begin(&self) -> Result<Lifetime, LifetimeError> {
        self.state().lifetime_begin()
    }

    /// Reclaim an explicit lifetime and free its slot.
    ///
    /// Fatal unless `lifetime` is currently checked out.
    pub fn lifetime_end(&self, lifetime: Lifetime) {
        self.try_lifetime_end(lifetime).or_raise()
    }

    /// Reclaim an explicit lifetime, reporting misuse as an error.
    pub fn try_lifetime_end(&self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        self.state().lifetime_end(lifetime)
    }

    /// Check out an explicit lifetime that is ended when the guard drops.
    pub fn explicit_lifetime(&self) -> ExplicitLifetime<'_> {
        ExplicitLifetime::new(self)
    }

    /// Whether `lifetime` is an explicit lifetime currently checked out.
    pub fn is_active(&self, lifetime: Lifetime) -> bool {
        self.state().is_active(lifetime)
    }

    // ==================== Ambient context ====================

    /// Make `lifetime` the ambient lifetime until the matching pop.
    pub fn push_api_lifetime(&self, lifetime: Lifetime) {
        self.state().push_lifetime(lifetime).or_raise()
    }

    /// Pop the ambient lifetime. Fatal if only the base entry remains.
    pub fn pop_api_lifetime(&self) -> Lifetime {
        self.try_pop_api_lifetime().or_raise()
    }

    /// Pop the ambient lifetime, reporting underflow as an error.
    pub fn try_pop_api_lifetime(&self) -> Result<Lifetime, LifetimeError> {
        self.state().pop_lifetime()
    }

    /// Make `align` the ambient alignment until the matching pop.
    pub fn push_api_alignment(&self, align: usize) {
        self.state().push_alignment(align).or_raise()
    }

    /// Pop the ambient alignment. Fatal if only the base entry remains.
    pub fn pop_api_alignment(&self) -> usize {
        self.try_pop_api_alignment().or_raise()
    }

    /// Pop the ambient alignment, reporting underflow as an error.
    pub fn try_pop_api_alignment(&self) -> Result<usize, LifetimeError> {
        self.state().pop_alignment()
    }

    /// Push for a scope guard. Returns the depth the guard must pop at.
    pub(crate) fn enter_lifetime_scope(&self, lifetime: Lifetime) -> usize {
        let mut state = self.state();
        state.push_lifetime(lifetime).or_raise();
        state.ambient_depths().0
    }

    pub(crate) fn exit_lifetime_scope(&self, depth: usize) -> Result<Lifetime, LifetimeError> {
        self.state().pop_lifetime_at(depth)
    }

    pub(crate) fn enter_alignment_scope(&self, align: usize) -> usize {
        let mut state = self.state();
        state.push_alignment(align).or_raise();
        state.ambient_depths().1
    }

    pub(crate) fn exit_alignment_scope(&self, depth: usize) -> Result<usize, LifetimeError> {
        self.state().pop_alignment_at(depth)
    }

    /// Push `lifetime` for as long as the returned guard lives.
    pub fn lifetime_scope(&self, lifetime: Lifetime) -> LifetimeScope<'_> {
        LifetimeScope::new(self, lifetime)
    }

    /// Push `align` for as long as the returned guard lives.
    pub fn alignment_scope(&self, align: usize) -> AlignmentScope<'_> {
        AlignmentScope::new(self, align)
    }

    /// Run `f` with `lifetime` ambient.
    pub fn with_lifetime<F, R>(&self, lifetime: Lifetime, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _scope = self.lifetime_scope(lifetime);
        f()
    }

    /// The current ambient lifetime.
    pub fn ambient_lifetime(&self) -> Lifetime {
        self.state().ambient_lifetime()
    }

    /// The current ambient alignment (0 = none).
    pub fn ambient_alignment(&self) -> usize {
        self.state().ambient_alignment()
    }

    // ==================== Introspection ====================

    /// Get current allocation statistics.
    pub fn stats(&self) -> AllocStats {
        self.state().stats()
    }

    /// Get the configuration.
    pub fn config(&self) -> AllocConfig {
        self.state().config().clone()
    }
}

impl Default for LifetimeAlloc {
    fn default() -> Self {
        Self::with_defaults()
    }
}
