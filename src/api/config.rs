//! Allocator configuration.

use crate::util::size::{kb, mb};

/// Configuration for the lifetime allocator.
///
/// The bounds here are fixed for the lifetime of an allocator: they size the
/// explicit lifetime table and the ambient context stacks.
#[derive(Debug, Clone)]
pub struct AllocConfig {
    /// Minimum size of a freshly created page (default: 64 KB)
    pub page_size: usize,

    /// Number of explicit lifetime slots (default: 64)
    pub max_explicit_lifetimes: usize,

    /// Maximum entries on each ambient stack, base entry included (default: 64)
    pub ambient_stack_depth: usize,

    /// Track allocation counters (ignored with the `minimal` feature)
    pub collect_stats: bool,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            page_size: kb(64),
            max_explicit_lifetimes: 64,
            ambient_stack_depth: 64,
            collect_stats: true,
        }
    }
}

impl AllocConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            page_size: kb(4),
            max_explicit_lifetimes: 8,
            ambient_stack_depth: 16,
            collect_stats: true,
        }
    }

    /// Create a config optimized for high-performance scenarios.
    pub fn high_performance() -> Self {
        Self {
            page_size: mb(1),
            max_explicit_lifetimes: 256,
            ambient_stack_depth: 128,
            collect_stats: false,
        }
    }

    /// Apply overrides from the environment.
    ///
    /// Reads `LIFEALLOC_PAGE_SIZE`, `LIFEALLOC_MAX_EXPLICIT` and
    /// `LIFEALLOC_STACK_DEPTH`. Unset or unparsable values are ignored.
    pub fn from_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());

        if let Some(size) = read("LIFEALLOC_PAGE_SIZE") {
            self.page_size = size;
        }
        if let Some(count) = read("LIFEALLOC_MAX_EXPLICIT") {
            self.max_explicit_lifetimes = count;
        }
        if let Some(depth) = read("LIFEALLOC_STACK_DEPTH") {
            self.ambient_stack_depth = depth;
        }
        self.sanitized()
    }

    /// Builder pattern: set page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self.sanitized()
    }

    /// Builder pattern: set number of explicit lifetime slots.
    pub fn with_max_explicit_lifetimes(mut self, count: usize) -> Self {
        self.max_explicit_lifetimes = count;
        self.sanitized()
    }

    /// Builder pattern: set ambient stack depth.
    pub fn with_ambient_stack_depth(mut self, depth: usize) -> Self {
        self.ambient_stack_depth = depth;
        self.sanitized()
    }

    /// Builder pattern: enable or disable statistics.
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.collect_stats = enable;
        self
    }

    /// Total number of lifetimes (static plus explicit).
    pub fn lifetime_count(&self) -> usize {
        crate::api::lifetime::Lifetime::STATIC_COUNT + self.max_explicit_lifetimes
    }

    // A page must hold at least one byte and each stack needs its base entry.
    // Lifetime ids are u32, so every slot index must fit after the static ones.
    pub(crate) fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.ambient_stack_depth = self.ambient_stack_depth.max(1);
        self.max_explicit_lifetimes = self.max_explicit_lifetimes.min(MAX_EXPLICIT_LIFETIMES);
        self
    }
}

/// Upper bound on explicit lifetime slots.
pub const MAX_EXPLICIT_LIFETIMES: usize = u32::MAX as usize - crate::api::lifetime::Lifetime::STATIC_COUNT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AllocConfig::default();
        assert_eq!(config.page_size, 65536);
        assert_eq!(config.max_explicit_lifetimes, 64);
        assert_eq!(config.lifetime_count(), 67);
    }

    #[test]
    fn test_overrides() {
        let config = AllocConfig::default().with_overrides(|key| match key {
            "LIFEALLOC_PAGE_SIZE" => Some("4096".to_string()),
            "LIFEALLOC_MAX_EXPLICIT" => Some(" 2 ".to_string()),
            "LIFEALLOC_STACK_DEPTH" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.max_explicit_lifetimes, 2);
        assert_eq!(config.ambient_stack_depth, 64);
    }

    #[test]
    fn test_builder_clamps() {
        let config = AllocConfig::minimal().with_page_size(0).with_ambient_stack_depth(0);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.ambient_stack_depth, 1);
    }

    #[test]
    fn test_explicit_count_fits_lifetime_ids() {
        let config = AllocConfig::minimal().with_max_explicit_lifetimes(usize::MAX);
        assert_eq!(config.max_explicit_lifetimes, MAX_EXPLICIT_LIFETIMES);
        assert_eq!(config.lifetime_count(), u32::MAX as usize);

        let last = crate::api::lifetime::Lifetime::explicit(config.max_explicit_lifetimes - 1);
        assert_eq!(last.explicit_slot(), Some(config.max_explicit_lifetimes - 1));
    }
}
