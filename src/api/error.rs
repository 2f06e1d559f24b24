//! Errors reported by the fallible allocator entry points.
//!
//! The infallible entry points treat every one of these as fatal: they emit
//! the matching diagnostic and panic.

use std::fmt;

use crate::api::lifetime::Lifetime;
use crate::diagnostics::{self, Diagnostic};

/// Which stack an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientStack {
    /// The ambient lifetime stack.
    Lifetime,
    /// The ambient alignment stack.
    Alignment,
    /// The thread's stack of installed allocators.
    Installed,
}

impl fmt::Display for AmbientStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbientStack::Lifetime => write!(f, "lifetime"),
            AmbientStack::Alignment => write!(f, "alignment"),
            AmbientStack::Installed => write!(f, "install"),
        }
    }
}

/// Exhaustion or misuse of the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeError {
    /// Header plus payload does not fit in `usize`.
    SizeOverflow { requested: usize },
    /// Alignment override that is neither zero nor a power of two.
    InvalidAlignment(usize),
    /// Allocation into an out-of-range or inactive explicit lifetime.
    NotLive(Lifetime),
    /// Access to memory whose lifetime has been reset since it was obtained.
    Stale(Lifetime),
    /// Every explicit lifetime slot is checked out.
    ExplicitExhausted { capacity: usize },
    /// End of a lifetime that is not an active explicit lifetime.
    NotActive(Lifetime),
    /// End of an explicit lifetime that is still on the ambient stack.
    StillAmbient(Lifetime),
    /// Push beyond the configured ambient stack depth.
    AmbientOverflow { stack: AmbientStack, depth: usize },
    /// Pop of the ambient stack's base entry.
    AmbientUnderflow { stack: AmbientStack },
    /// A scope guard found its entry at another depth than it pushed it at.
    ScopeOrder { stack: AmbientStack, expected: usize, found: usize },
}

impl LifetimeError {
    /// The diagnostic emitted when this error is treated as fatal.
    pub fn diagnostic(&self) -> &'static Diagnostic {
        match self {
            LifetimeError::SizeOverflow { .. } => &diagnostics::LA001,
            LifetimeError::InvalidAlignment(_) => &diagnostics::LA002,
            LifetimeError::NotLive(_) => &diagnostics::LA003,
            LifetimeError::Stale(_) => &diagnostics::LA004,
            LifetimeError::ExplicitExhausted { .. } => &diagnostics::LA101,
            LifetimeError::NotActive(_) => &diagnostics::LA103,
            LifetimeError::StillAmbient(_) => &diagnostics::LA104,
            LifetimeError::AmbientOverflow { .. } => &diagnostics::LA202,
            LifetimeError::AmbientUnderflow { .. } => &diagnostics::LA203,
            LifetimeError::ScopeOrder { .. } => &diagnostics::LA204,
        }
    }

    /// Emit the matching diagnostic and panic.
    pub(crate) fn raise(self) -> ! {
        diagnostics::emit::fatal(self.diagnostic(), &self)
    }
}

impl fmt::Display for LifetimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifetimeError::SizeOverflow { requested } => {
                write!(f, "allocation of {} bytes overflows the address space", requested)
            }
            LifetimeError::InvalidAlignment(align) => {
                write!(f, "alignment {} is not a power of two", align)
            }
            LifetimeError::NotLive(life) => {
                write!(f, "lifetime {} is not live", life)
            }
            LifetimeError::Stale(life) => {
                write!(f, "lifetime {} was reset after this memory was obtained", life)
            }
            LifetimeError::ExplicitExhausted { capacity } => {
                write!(f, "all {} explicit lifetimes are active", capacity)
            }
            LifetimeError::NotActive(life) => {
                write!(f, "lifetime {} is not an active explicit lifetime", life)
            }
            LifetimeError::StillAmbient(life) => {
                write!(f, "lifetime {} is still on the ambient stack", life)
            }
            LifetimeError::ScopeOrder { stack, expected, found } => write!(
                f,
                "{} scope pushed at depth {} dropped at depth {}",
                stack, expected, found
            ),
            LifetimeError::AmbientOverflow { stack, depth } => {
                write!(f, "ambient {} stack is full at depth {}", stack, depth)
            }
            LifetimeError::AmbientUnderflow { stack } => {
                write!(f, "ambient {} stack popped below its base", stack)
            }
        }
    }
}

impl std::error::Error for LifetimeError {}

/// Unwrap an allocator result, treating the error as fatal.
pub(crate) trait OrRaise<T> {
    fn or_raise(self) -> T;
}

impl<T> OrRaise<T> for Result<T, LifetimeError> {
    #[inline]
    fn or_raise(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => err.raise(),
        }
    }
}
