//! Allocator state: explicit lifetime registry, ambient context and the
//! state object tying them to the arena pool.

pub(crate) mod context;
pub(crate) mod registry;
pub mod state;
pub(crate) mod tls;
