//! Explicit lifetime registry.
//!
//! A fixed table of slots layered above the static lifetimes. Each slot is
//! `Free` or `Active`; begin takes the lowest free slot, end releases it.

use crate::api::error::LifetimeError;
use crate::api::lifetime::Lifetime;

#[cfg(feature = "debug")]
use crate::debug::CheckoutTraces;

/// Usage table for explicit lifetimes.
pub(crate) struct ExplicitRegistry {
    /// `true` exactly between a successful begin and its matching end
    used: Box<[bool]>,

    /// Number of `true` entries in `used`
    active: usize,

    #[cfg(feature = "debug")]
    traces: CheckoutTraces,
}

impl ExplicitRegistry {
    /// Create a registry with `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            used: vec![false; capacity].into_boxed_slice(),
            active: 0,
            #[cfg(feature = "debug")]
            traces: CheckoutTraces::new(capacity),
        }
    }

    /// Check out the lowest free slot.
    pub fn begin(&mut self) -> Result<Lifetime, LifetimeError> {
        let Some(slot) = self.used.iter().position(|used| !used) else {
            return Err(LifetimeError::ExplicitExhausted {
                capacity: self.used.len(),
            });
        };

        self.used[slot] = true;
        self.active += 1;

        #[cfg(feature = "debug")]
        self.traces.record(slot);

        Ok(Lifetime::explicit(slot))
    }

    /// Validate that `lifetime` may be ended, returning its slot.
    ///
    /// Does not release the slot; the caller resets the pages first.
    pub fn check_active(&self, lifetime: Lifetime) -> Result<usize, LifetimeError> {
        match lifetime.explicit_slot() {
            Some(slot) if self.used.get(slot).copied().unwrap_or(false) => Ok(slot),
            _ => Err(LifetimeError::NotActive(lifetime)),
        }
    }

    /// Return a slot to the free pool.
    pub fn release(&mut self, slot: usize) {
        debug_assert!(self.used[slot]);
        self.used[slot] = false;
        self.active -= 1;

        #[cfg(feature = "debug")]
        self.traces.clear(slot);
    }

    /// Whether `lifetime` is an explicit lifetime that is currently checked out.
    pub fn is_active(&self, lifetime: Lifetime) -> bool {
        self.check_active(lifetime).is_ok()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Where each active slot was begun, for the exhaustion report.
    #[cfg(feature = "debug")]
    pub fn describe_checkouts(&self) -> String {
        self.traces.describe()
    }
}
