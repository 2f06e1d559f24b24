//! Allocator diagnostics.
//!
//! Fatal conditions (exhaustion and misuse) emit a coded diagnostic and then
//! panic. Non-fatal conditions emit a warning that strict mode can escalate.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | LA0xx | Allocation issues              |
//! | LA1xx | Explicit lifetime issues       |
//! | LA2xx | Ambient context stack issues   |
//! | LA9xx | Internal errors                |

pub mod emit;
pub mod kind;
pub mod macros;
pub mod strict;

pub use emit::{emit, emit_with_context, set_verbose, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard, STRICT_ENV_VAR};

pub use kind::{LA001, LA002, LA003, LA004, LA101, LA102, LA103, LA104, LA105, LA201, LA202, LA203, LA204, LA901};
