//! Diagnostic kinds and the predefined allocator diagnostics.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - the allocator cannot continue.
    Error,
    /// A warning - something is probably wrong or wasteful.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `LA0xx` - Allocation issues
/// - `LA1xx` - Explicit lifetime issues
/// - `LA2xx` - Ambient context stack issues
/// - `LA9xx` - Internal errors
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "LA101").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new note diagnostic. Notes never escalate under strict mode.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Note,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// LA0xx - Allocation
// =============================================================================

/// LA001: Requested size cannot be represented.
pub const LA001: Diagnostic = Diagnostic::error(
    "LA001",
    "allocation size overflows the address space"
).with_note("header, padding and payload together exceed usize::MAX");

/// LA002: Alignment override is not a power of two.
pub const LA002: Diagnostic = Diagnostic::error(
    "LA002",
    "alignment is not a power of two"
).with_help("pass None (or 0) for unaligned allocation, or a power of two");

/// LA003: Allocation targets a lifetime that is not live.
pub const LA003: Diagnostic = Diagnostic::error(
    "LA003",
    "allocation into a lifetime that is not live"
).with_note("explicit lifetimes only accept allocations between lifetime_begin() and lifetime_end()")
 .with_help("allocate into a lifetime returned by lifetime_begin(), or into App/World/Frame");

/// LA004: Memory used after its lifetime was reset.
pub const LA004: Diagnostic = Diagnostic::error(
    "LA004",
    "memory used after its lifetime was reset"
).with_note("free_pages(), end_frame() and lifetime_end() invalidate everything allocated in that lifetime")
 .with_help("rebuild the collection after the reset, or allocate it in a longer lifetime");

// =============================================================================
// LA1xx - Explicit lifetimes
// =============================================================================

/// LA101: Every explicit lifetime slot is checked out.
pub const LA101: Diagnostic = Diagnostic::error(
    "LA101",
    "explicit lifetime table exhausted"
).with_note("every explicit lifetime slot is between lifetime_begin() and lifetime_end()")
 .with_help("look for a lifetime_begin() without a matching lifetime_end(), or raise max_explicit_lifetimes");

/// LA102: Allocator dropped with explicit lifetimes still checked out.
pub const LA102: Diagnostic = Diagnostic::warning(
    "LA102",
    "allocator dropped with explicit lifetimes still active"
).with_help("end every explicit lifetime, or hold it through an ExplicitLifetime guard");

/// LA103: lifetime_end() on something that is not an active explicit lifetime.
pub const LA103: Diagnostic = Diagnostic::error(
    "LA103",
    "ended a lifetime that is not an active explicit lifetime"
).with_note("static lifetimes are reclaimed with free_pages(); explicit lifetimes may be ended once")
 .with_help("check for a double lifetime_end() or a lifetime that was never begun");

/// LA104: lifetime_end() on a lifetime that is still on the ambient stack.
pub const LA104: Diagnostic = Diagnostic::error(
    "LA104",
    "ended an explicit lifetime that is still ambient"
).with_note("its slot would be reused while ambient allocations still target it")
 .with_help("drop the LifetimeScope (or pop the lifetime) before ending it");

/// LA105: Where the explicit lifetimes holding every slot were begun.
pub const LA105: Diagnostic = Diagnostic::note(
    "LA105",
    "explicit lifetime checkouts"
);

// =============================================================================
// LA2xx - Ambient context stack
// =============================================================================

/// LA201: Allocator dropped with pushes that were never popped.
pub const LA201: Diagnostic = Diagnostic::warning(
    "LA201",
    "allocator dropped with an unbalanced ambient stack"
).with_help("use LifetimeScope/AlignmentScope guards so every push is popped");

/// LA202: Ambient stack bound exceeded.
pub const LA202: Diagnostic = Diagnostic::error(
    "LA202",
    "ambient context stack overflow"
).with_help("raise ambient_stack_depth or look for a push without a matching pop");

/// LA203: Pop of the base sentinel.
pub const LA203: Diagnostic = Diagnostic::error(
    "LA203",
    "ambient context stack underflow"
).with_note("the base entry of the ambient stack can never be popped");

/// LA204: A scope guard popped an entry that was not its own.
pub const LA204: Diagnostic = Diagnostic::error(
    "LA204",
    "scope guard dropped out of order"
).with_note("guards must be dropped in the reverse order they were created")
 .with_help("do not drop an outer scope guard while an inner one is alive");

// =============================================================================
// LA9xx - Internal
// =============================================================================

/// LA901: Allocator state re-entered while already borrowed.
pub const LA901: Diagnostic = Diagnostic::error(
    "LA901",
    "allocator state re-entered while in use"
).with_note("an allocator operation ran while another operation on the same allocator was in progress");
