//! Thread-local installed allocator.
//!
//! Foreign libraries call realloc/free hooks that carry no context. The
//! innermost allocator installed on the current thread serves those calls,
//! allocating into its ambient lifetime.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::api::alloc::LifetimeAlloc;
use crate::api::error::{AmbientStack, LifetimeError};

thread_local! {
    static INSTALLED: RefCell<Vec<LifetimeAlloc>> = const { RefCell::new(Vec::new()) };
}

/// Guard returned by [`install`]. Uninstalls the allocator when dropped.
///
/// Installations nest; guards must be dropped in reverse order. Dropping an
/// outer guard first is fatal (`LA204`) and uninstalls nothing.
pub struct InstallGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

/// Make `alloc` the target of [`foreign_realloc`] on this thread.
pub fn install(alloc: &LifetimeAlloc) -> InstallGuard {
    let depth = INSTALLED.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(alloc.clone());
        stack.len()
    });
    InstallGuard {
        depth,
        _not_send: PhantomData,
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let found = INSTALLED.with(|stack| {
            let mut stack = stack.borrow_mut();
            let found = stack.len();
            if found == self.depth {
                stack.pop();
            }
            found
        });

        if found != self.depth && !std::thread::panicking() {
            LifetimeError::ScopeOrder {
                stack: AmbientStack::Installed,
                expected: self.depth,
                found,
            }
            .raise();
        }
    }
}

/// The innermost installed allocator on this thread, if any.
pub fn installed() -> Option<LifetimeAlloc> {
    INSTALLED.with(|stack| stack.borrow().last().cloned())
}

/// Context-free realloc hook for lifetime-unaware libraries.
///
/// A null `ptr` allocates in the installed allocator's ambient lifetime;
/// otherwise the block grows in the lifetime it was first allocated in.
/// Returns null when no allocator is installed on this thread.
///
/// # Safety
///
/// `ptr` must be null or a live pointer returned by the installed allocator.
pub unsafe fn foreign_realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
    match installed() {
        Some(alloc) => alloc.reallocate_for_foreign(NonNull::new(ptr), new_size).as_ptr(),
        None => std::ptr::null_mut(),
    }
}

/// Context-free free hook. Memory is reclaimed per lifetime, so this does
/// nothing.
pub fn foreign_free(_ptr: *mut u8) {}
