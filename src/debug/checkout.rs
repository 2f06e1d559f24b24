//! Backtraces recorded at `lifetime_begin`.
//!
//! When the explicit lifetime table runs out, these show which call sites
//! are holding slots without ending them.

use std::fmt::Write;

use backtrace::Backtrace;

/// One optional unresolved backtrace per explicit slot.
pub(crate) struct CheckoutTraces {
    slots: Vec<Option<Backtrace>>,
}

impl CheckoutTraces {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Capture the current stack for `slot`. Symbols are resolved lazily.
    pub fn record(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(Backtrace::new_unresolved());
        }
    }

    pub fn clear(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
    }

    /// Resolve and format every recorded checkout.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (slot, trace) in self.slots.iter().enumerate() {
            if let Some(trace) = trace {
                let mut trace = trace.clone();
                trace.resolve();
                let _ = writeln!(out, "explicit#{} begun at:\n{:?}", slot, trace);
            }
        }
        out
    }
}
