//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr or the `log` crate.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::{Diagnostic, DiagnosticKind};
use super::strict::{should_panic, should_panic_on_warning};

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Global flag to enable verbose diagnostics.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Enable verbose diagnostic output.
pub fn set_verbose(verbose: bool) {
    VERBOSE_DIAGNOSTICS.store(verbose, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
///
/// Output goes to the `log` crate when that feature is enabled, and to
/// stderr in debug builds or with the `diagnostics` feature.
pub fn emit(diag: &Diagnostic) {
    emit_with_context(diag, "");
}

/// Emit a diagnostic with additional runtime context.
///
/// Warnings escalate to a panic under [`StrictMode::PanicOnWarning`].
///
/// [`StrictMode::PanicOnWarning`]: super::StrictMode::PanicOnWarning
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    if !is_suppressed() {
        #[cfg(feature = "log")]
        emit_to_log(diag, context);

        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        emit_to_stderr(diag, context);
    }

    if diag.kind == DiagnosticKind::Warning && should_panic_on_warning() {
        panic!(
            "[lifealloc][{}] {}\nStrict mode enabled - warnings are fatal.",
            diag.code, diag.message
        );
    }
    if diag.kind == DiagnosticKind::Error && should_panic() {
        panic!(
            "[lifealloc][{}] {}\nStrict mode enabled - errors are fatal.",
            diag.code, diag.message
        );
    }
}

/// Emit an error diagnostic and abort the current operation.
///
/// Used for exhaustion and misuse, which the allocator never recovers from.
pub(crate) fn fatal(diag: &Diagnostic, detail: &dyn std::fmt::Display) -> ! {
    if !is_suppressed() {
        #[cfg(feature = "log")]
        log::error!("[{}] {}: {}", diag.code, diag.message, detail);

        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        emit_to_stderr(diag, &detail.to_string());
    }
    panic!("[lifealloc][{}] {}", diag.code, detail);
}

#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    let mut stderr = std::io::stderr();
    let verbose = VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed);

    let _ = writeln!(
        stderr,
        "[lifealloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }

    if verbose && diag.kind == DiagnosticKind::Error {
        let _ = writeln!(stderr, "  hint: set RUST_BACKTRACE=1 for a backtrace");
    }

    let _ = writeln!(stderr);
}

#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    match diag.kind {
        DiagnosticKind::Error => log::error!("[{}] {}", diag.code, diag.message),
        DiagnosticKind::Warning => log::warn!("[{}] {}", diag.code, diag.message),
        DiagnosticKind::Note => log::info!("[{}] {}", diag.code, diag.message),
    }

    if !context.is_empty() {
        log::info!("  context: {}", context);
    }
    if let Some(note) = diag.note {
        log::info!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::info!("  help: {}", help);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::LA101;

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }

    #[test]
    #[should_panic(expected = "LA101")]
    fn test_fatal_panics_with_code() {
        fatal(&LA101, &"no free slot");
    }
}
