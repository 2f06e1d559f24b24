//! Ambient context stacks.
//!
//! Lifetime-unaware code (growable arrays, foreign realloc hooks) allocates
//! into whatever lifetime and alignment sit on top of these stacks.

use crate::api::error::{AmbientStack, LifetimeError};
use crate::api::lifetime::Lifetime;
use crate::util::layout::is_valid_alignment;

/// A bounded LIFO stack whose base entry can never be popped.
pub(crate) struct SentinelStack<T> {
    items: Vec<T>,
    limit: usize,
    kind: AmbientStack,
}

impl<T: Copy> SentinelStack<T> {
    /// Create a stack holding only `sentinel`, bounded to `limit` entries.
    pub fn new(kind: AmbientStack, sentinel: T, limit: usize) -> Self {
        let limit = limit.max(1);
        let mut items = Vec::with_capacity(limit);
        items.push(sentinel);
        Self { items, limit, kind }
    }

    pub fn push(&mut self, value: T) -> Result<(), LifetimeError> {
        if self.items.len() >= self.limit {
            return Err(LifetimeError::AmbientOverflow {
                stack: self.kind,
                depth: self.limit,
            });
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T, LifetimeError> {
        if self.items.len() <= 1 {
            return Err(LifetimeError::AmbientUnderflow { stack: self.kind });
        }
        let top = self.top();
        self.items.truncate(self.items.len() - 1);
        Ok(top)
    }

    /// Pop the entry a guard pushed at `depth`. Fails if anything else is on top.
    pub fn pop_at(&mut self, depth: usize) -> Result<T, LifetimeError> {
        let found = self.depth();
        if found != depth {
            return Err(LifetimeError::ScopeOrder {
                stack: self.kind,
                expected: depth,
                found,
            });
        }
        self.pop()
    }

    /// The current top entry. Never empty.
    pub fn top(&self) -> T {
        self.items[self.items.len() - 1]
    }

    /// Entries pushed above the sentinel.
    pub fn depth(&self) -> usize {
        self.items.len() - 1
    }

    fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.items[1..].contains(value)
    }
}

/// The two ambient stacks: lifetime and alignment.
///
/// The base entries are [`Lifetime::APP`] and alignment `0` (none).
pub(crate) struct AmbientContext {
    lifetimes: SentinelStack<Lifetime>,
    alignments: SentinelStack<usize>,
}

impl AmbientContext {
    pub fn new(limit: usize) -> Self {
        Self {
            lifetimes: SentinelStack::new(AmbientStack::Lifetime, Lifetime::APP, limit),
            alignments: SentinelStack::new(AmbientStack::Alignment, 0, limit),
        }
    }

    pub fn push_lifetime(&mut self, lifetime: Lifetime) -> Result<(), LifetimeError> {
        self.lifetimes.push(lifetime)
    }

    pub fn pop_lifetime(&mut self) -> Result<Lifetime, LifetimeError> {
        self.lifetimes.pop()
    }

    pub fn pop_lifetime_at(&mut self, depth: usize) -> Result<Lifetime, LifetimeError> {
        self.lifetimes.pop_at(depth)
    }

    /// Whether `lifetime` was pushed and not yet popped.
    pub fn holds_lifetime(&self, lifetime: Lifetime) -> bool {
        self.lifetimes.contains(&lifetime)
    }

    pub fn push_alignment(&mut self, align: usize) -> Result<(), LifetimeError> {
        if !is_valid_alignment(align) {
            return Err(LifetimeError::InvalidAlignment(align));
        }
        self.alignments.push(align)
    }

    pub fn pop_alignment(&mut self) -> Result<usize, LifetimeError> {
        self.alignments.pop()
    }

    pub fn pop_alignment_at(&mut self, depth: usize) -> Result<usize, LifetimeError> {
        self.alignments.pop_at(depth)
    }

    /// Lifetime used by allocations that don't name one.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetimes.top()
    }

    /// Alignment used by allocations that don't name one (0 = none).
    pub fn alignment(&self) -> usize {
        self.alignments.top()
    }

    /// Outstanding pushes on (lifetime, alignment) stacks.
    pub fn depths(&self) -> (usize, usize) {
        (self.lifetimes.depth(), self.alignments.depth())
    }
}
