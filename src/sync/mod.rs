//! Synchronization primitives.
//!
//! Provides a thin wrapper over std or parking_lot mutexes for the shared
//! allocator.

pub(crate) mod mutex;
