//! Scope guards for RAII-style ambient context and explicit lifetimes.
//!
//! Each guard undoes its push (or ends its lifetime) on drop, so the ambient
//! stacks stay balanced on every exit path, unwinding included. A guard only
//! pops its own entry: dropping an outer guard while an inner one is alive is
//! fatal (`LA204`) and leaves both entries in place.

use std::ptr::NonNull;

use crate::api::alloc::LifetimeAlloc;
use crate::api::lifetime::Lifetime;

/// Keeps a lifetime on the ambient stack while alive.
///
/// # Example
///
/// ```rust
/// use lifealloc::{LifetimeAlloc, Lifetime};
///
/// let alloc = LifetimeAlloc::with_defaults();
///
/// {
///     let _scope = alloc.lifetime_scope(Lifetime::FRAME);
///     let temp = alloc.allocate(1024);
///     // temp lives in the frame lifetime
/// }
/// assert_eq!(alloc.ambient_lifetime(), Lifetime::APP);
/// ```
#[must_use = "the lifetime is popped as soon as the guard is dropped"]
pub struct LifetimeScope<'a> {
    alloc: &'a LifetimeAlloc,
    lifetime: Lifetime,
    depth: usize,
}

impl<'a> LifetimeScope<'a> {
    pub(crate) fn new(alloc: &'a LifetimeAlloc, lifetime: Lifetime) -> Self {
        let depth = alloc.enter_lifetime_scope(lifetime);
        Self { alloc, lifetime, depth }
    }

    /// The lifetime this guard pushed.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

impl<'a> Drop for LifetimeScope<'a> {
    fn drop(&mut self) {
        pop_or_raise(self.alloc.exit_lifetime_scope(self.depth).map(drop));
    }
}

/// Keeps an alignment on the ambient stack while alive.
#[must_use = "the alignment is popped as soon as the guard is dropped"]
pub struct AlignmentScope<'a> {
    alloc: &'a LifetimeAlloc,
    align: usize,
    depth: usize,
}

impl<'a> AlignmentScope<'a> {
    pub(crate) fn new(alloc: &'a LifetimeAlloc, align: usize) -> Self {
        let depth = alloc.enter_alignment_scope(align);
        Self { alloc, align, depth }
    }

    /// The alignment this guard pushed.
    pub fn alignment(&self) -> usize {
        self.align
    }
}

impl<'a> Drop for AlignmentScope<'a> {
    fn drop(&mut self) {
        pop_or_raise(self.alloc.exit_alignment_scope(self.depth).map(drop));
    }
}

// A failed pop while already unwinding would abort; let the first panic win.
fn pop_or_raise(result: Result<(), crate::api::error::LifetimeError>) {
    if let Err(err) = result {
        if !std::thread::panicking() {
            err.raise();
        }
    }
}

/// An explicit lifetime that is ended when the guard drops.
///
/// # Example
///
/// ```rust
/// use lifealloc::LifetimeAlloc;
///
/// let alloc = LifetimeAlloc::with_defaults();
/// let life = {
///     let scratch = alloc.explicit_lifetime();
///     let _nodes = scratch.allocate_array::<u32>(64);
///     scratch.lifetime()
/// }; // pages zeroed, slot returned
/// assert!(!alloc.is_active(life));
/// ```
#[must_use = "the lifetime is ended as soon as the guard is dropped"]
pub struct ExplicitLifetime<'a> {
    alloc: &'a LifetimeAlloc,
    lifetime: Lifetime,
}

impl<'a> ExplicitLifetime<'a> {
    pub(crate) fn new(alloc: &'a LifetimeAlloc) -> Self {
        let lifetime = alloc.lifetime_begin();
        Self { alloc, lifetime }
    }

    /// The checked-out lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Allocate bytes in this lifetime.
    pub fn allocate_bytes(&self, num_bytes: usize, alignment: Option<usize>) -> NonNull<u8> {
        self.alloc.allocate_bytes(num_bytes, self.lifetime, alignment)
    }

    /// Allocate space for `count` values of `T` in this lifetime.
    pub fn allocate_array<T>(&self, count: usize) -> NonNull<T> {
        self.alloc.allocate_array::<T>(count, self.lifetime)
    }

    /// Make this lifetime ambient for as long as the returned guard lives.
    ///
    /// The scope borrows this guard, so the lifetime cannot end under it:
    ///
    /// ```compile_fail
    /// use lifealloc::LifetimeAlloc;
    ///
    /// let alloc = LifetimeAlloc::with_defaults();
    /// let scratch = alloc.explicit_lifetime();
    /// let scope = scratch.scope();
    /// drop(scratch);
    /// drop(scope);
    /// ```
    pub fn scope(&self) -> LifetimeScope<'_> {
        LifetimeScope::new(self.alloc, self.lifetime)
    }

    /// Release the guard without ending the lifetime.
    ///
    /// The caller becomes responsible for `lifetime_end`.
    pub fn into_raw(self) -> Lifetime {
        let lifetime = self.lifetime;
        std::mem::forget(self);
        lifetime
    }
}

impl<'a> Drop for ExplicitLifetime<'a> {
    fn drop(&mut self) {
        pop_or_raise(self.alloc.try_lifetime_end(self.lifetime));
    }
}
