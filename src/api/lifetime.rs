//! Lifetime identifiers.
//!
//! A [`Lifetime`] names a reclamation scope. The set is closed: three static
//! lifetimes plus a fixed number of explicit slots chosen when the allocator
//! is built.

use std::fmt;

/// A named scope controlling when a group of allocations is bulk-reclaimed.
///
/// Internally a dense index: `App = 0`, `World = 1`, `Frame = 2`, and
/// explicit slot `i` at `3 + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Lifetime(u32);

/// What kind of scope a [`Lifetime`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimeKind {
    /// Lives until the process exits.
    App,
    /// Lives until the current world/level is torn down.
    World,
    /// Cleared once per engine tick.
    Frame,
    /// Dynamically acquired slot, valid between begin and end.
    Explicit(usize),
}

impl Lifetime {
    /// Memory lives until the app closes.
    pub const APP: Lifetime = Lifetime(0);
    /// Memory lives until the world is unloaded.
    pub const WORLD: Lifetime = Lifetime(1);
    /// Memory gets cleared every frame.
    pub const FRAME: Lifetime = Lifetime(2);

    /// Number of static lifetimes preceding the explicit slots.
    pub const STATIC_COUNT: usize = 3;

    pub(crate) const fn explicit(slot: usize) -> Lifetime {
        Lifetime((Self::STATIC_COUNT + slot) as u32)
    }

    pub(crate) const fn from_index(index: usize) -> Lifetime {
        Lifetime(index as u32)
    }

    /// Dense index of this lifetime, used to select its arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Classify this lifetime.
    pub const fn kind(self) -> LifetimeKind {
        match self.0 {
            0 => LifetimeKind::App,
            1 => LifetimeKind::World,
            2 => LifetimeKind::Frame,
            n => LifetimeKind::Explicit(n as usize - Self::STATIC_COUNT),
        }
    }

    /// Whether this is a dynamically acquired lifetime.
    pub const fn is_explicit(self) -> bool {
        self.index() >= Self::STATIC_COUNT
    }

    /// The explicit slot number, if this is an explicit lifetime.
    pub const fn explicit_slot(self) -> Option<usize> {
        match self.kind() {
            LifetimeKind::Explicit(slot) => Some(slot),
            _ => None,
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LifetimeKind::App => write!(f, "app"),
            LifetimeKind::World => write!(f, "world"),
            LifetimeKind::Frame => write!(f, "frame"),
            LifetimeKind::Explicit(slot) => write!(f, "explicit#{}", slot),
        }
    }
}
