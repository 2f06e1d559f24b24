//! # lifealloc
//!
//! Lifetime-scoped bump allocation for game engines.
//!
//! Every allocation belongs to a lifetime: the whole application, the
//! current world (level), the current frame, or an explicit lifetime checked
//! out for the duration of some task. Memory is never freed one allocation at
//! a time; a lifetime is reclaimed in bulk by zeroing all of its pages.
//!
//! ## Features
//!
//! - Page-backed bump arenas, one per lifetime, grown on demand
//! - A small header before every allocation recording its size and lifetime
//! - An ambient lifetime and alignment stack for code that cannot take them
//!   as parameters, with RAII scope guards
//! - A realloc-shaped hook for lifetime-unaware libraries
//! - Coded diagnostics; exhaustion and misuse are fatal
//!
//! ## Quick Start
//!
//! ```rust
//! use lifealloc::{AllocConfig, Lifetime, LifetimeAlloc};
//!
//! let alloc = LifetimeAlloc::new(AllocConfig::default());
//!
//! // Game loop
//! let particles = alloc.allocate_array::<[f32; 4]>(1024, Lifetime::FRAME);
//! // ... use particles ...
//! alloc.end_frame();
//! ```

pub mod api;
pub mod diagnostics;

mod allocators;
mod core;
mod sync;
mod util;

#[cfg(feature = "debug")]
mod debug;

// Re-export public API at crate root for convenience
pub use api::alloc::LifetimeAlloc;
pub use api::boot;
pub use api::config::{AllocConfig, MAX_EXPLICIT_LIFETIMES};
pub use api::error::{AmbientStack, LifetimeError};
pub use api::lifetime::{Lifetime, LifetimeKind};
pub use api::scope::{AlignmentScope, ExplicitLifetime, LifetimeScope};
pub use api::shared::SharedLifetimeAlloc;
pub use api::stats::{AllocStats, LifetimeStats};
pub use api::stretchy::LifeVec;

pub use allocators::header::{AllocHeader, HEADER_SIZE};
pub use self::core::state::AllocatorState;

// Foreign-library hook
pub use self::core::tls::{foreign_free, foreign_realloc, install, installed, InstallGuard};

// Diagnostics - core types and predefined codes
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{set_strict_mode, StrictMode, StrictModeGuard};

// Size helpers
pub use util::size::{format_bytes, kb, mb};
