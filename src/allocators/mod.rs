//! Allocation backends.
//!
//! Page storage, the per-lifetime page lists and the header layout.

pub(crate) mod arena;
pub(crate) mod header;
pub(crate) mod page;
