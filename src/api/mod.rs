//! Public API for lifealloc.
//!
//! Most users only need [`alloc::LifetimeAlloc`] and the scope guards.

pub mod alloc;
pub mod boot;
pub mod config;
pub mod error;
pub mod lifetime;
pub mod scope;
pub mod shared;
pub mod stats;
pub mod stretchy;
