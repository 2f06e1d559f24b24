//! Debug utilities for tracking explicit lifetime checkouts.
//!
//! Only compiled when the `debug` feature is enabled.

mod checkout;

pub(crate) use checkout::CheckoutTraces;
