//! How far non-fatal diagnostics escalate.
//!
//! Fatal allocator errors always panic. The strict mode only governs the
//! diagnostics that are otherwise just reported, such as the drop-time leak
//! warnings. It starts out unset and is taken from `LIFEALLOC_STRICT` the
//! first time anything consults it, unless [`set_strict_mode`] ran earlier.

use std::sync::atomic::{AtomicU8, Ordering};

/// Variable read on first use.
pub const STRICT_ENV_VAR: &str = "LIFEALLOC_STRICT";

/// Escalation level for emitted diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StrictMode {
    /// Report only.
    Warn = 0,
    /// Errors panic after being reported.
    PanicOnError = 1,
    /// Errors and warnings panic after being reported.
    PanicOnWarning = 2,
}

impl StrictMode {
    /// Parse a `LIFEALLOC_STRICT` value. Anything unrecognized is `Warn`.
    ///
    /// `1`, `error` and `true` select [`StrictMode::PanicOnError`];
    /// `2`, `warning` and `all` select [`StrictMode::PanicOnWarning`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "error" | "true" => StrictMode::PanicOnError,
            "2" | "warning" | "all" => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => StrictMode::PanicOnError,
            2 => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }
}

const UNSET: u8 = u8::MAX;

static MODE: AtomicU8 = AtomicU8::new(UNSET);

/// Set the strict mode, overriding the environment.
pub fn set_strict_mode(mode: StrictMode) {
    MODE.store(mode as u8, Ordering::Release);
}

/// The current strict mode, resolving it from the environment on first use.
pub fn strict_mode() -> StrictMode {
    let raw = MODE.load(Ordering::Acquire);
    if raw != UNSET {
        return StrictMode::from_raw(raw);
    }

    let mode = mode_from(std::env::var(STRICT_ENV_VAR).ok().as_deref());
    // A concurrent set_strict_mode wins over the environment.
    match MODE.compare_exchange(UNSET, mode as u8, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => mode,
        Err(current) => StrictMode::from_raw(current),
    }
}

/// Re-read `LIFEALLOC_STRICT`, replacing whatever mode is current.
///
/// Only needed when the variable changes after startup.
pub fn init_from_env() {
    set_strict_mode(mode_from(std::env::var(STRICT_ENV_VAR).ok().as_deref()));
}

fn mode_from(value: Option<&str>) -> StrictMode {
    value.map_or(StrictMode::Warn, StrictMode::parse)
}

pub(crate) fn should_panic() -> bool {
    strict_mode() != StrictMode::Warn
}

pub(crate) fn should_panic_on_warning() -> bool {
    strict_mode() == StrictMode::PanicOnWarning
}

/// Sets a strict mode for as long as it lives, then restores the previous one.
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }

    pub fn panic_on_error() -> Self {
        Self::new(StrictMode::PanicOnError)
    }

    pub fn panic_on_warning() -> Self {
        Self::new(StrictMode::PanicOnWarning)
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Serializes tests that change the process-wide mode.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
