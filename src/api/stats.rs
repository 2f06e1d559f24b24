//! Allocation statistics.

use crate::api::lifetime::Lifetime;
use crate::util::size::format_bytes;

/// Page usage of a single lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifetimeStats {
    /// The lifetime these numbers describe.
    pub lifetime: Lifetime,
    /// Bytes handed out since the lifetime was last reset.
    pub used_bytes: usize,
    /// Bytes of page storage owned by the lifetime.
    pub capacity_bytes: usize,
    /// Pages owned by the lifetime.
    pub page_count: usize,
}

/// Aggregated allocation statistics.
///
/// Page figures are always exact. Counters (`allocation_count` and below)
/// stay at zero when statistics are disabled.
#[derive(Debug, Clone, Default)]
pub struct AllocStats {
    /// Bytes currently handed out, headers and padding included.
    pub used_bytes: usize,

    /// Peak of `used_bytes` (high water mark).
    pub peak_bytes: usize,

    /// Bytes of page storage across every lifetime.
    pub capacity_bytes: usize,

    /// Pages across every lifetime.
    pub page_count: usize,

    /// Total number of allocations performed.
    pub allocation_count: u64,

    /// Allocations made through the foreign realloc path.
    pub realloc_count: u64,

    /// Bytes left behind by reallocation until their lifetime is reset.
    pub abandoned_bytes: usize,

    /// Explicit lifetimes currently checked out.
    pub active_explicit_lifetimes: usize,

    /// Per-lifetime breakdown, for lifetimes that own at least one page.
    pub lifetimes: Vec<LifetimeStats>,
}

impl AllocStats {
    /// Page usage of one lifetime, if it owns any pages.
    pub fn lifetime(&self, lifetime: Lifetime) -> Option<&LifetimeStats> {
        self.lifetimes.iter().find(|s| s.lifetime == lifetime)
    }

    /// Fraction of page storage currently handed out.
    pub fn utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.capacity_bytes as f64
    }
}

impl std::fmt::Display for AllocStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Allocation Statistics:")?;
        writeln!(f, "  Used:            {}", format_bytes(self.used_bytes))?;
        writeln!(f, "  Peak:            {}", format_bytes(self.peak_bytes))?;
        writeln!(f, "  Capacity:        {} in {} pages", format_bytes(self.capacity_bytes), self.page_count)?;
        writeln!(f, "  Allocations:     {}", self.allocation_count)?;
        writeln!(f, "  Reallocations:   {}", self.realloc_count)?;
        writeln!(f, "  Abandoned:       {}", format_bytes(self.abandoned_bytes))?;
        writeln!(f, "  Active explicit: {}", self.active_explicit_lifetimes)?;
        for life in &self.lifetimes {
            writeln!(
                f,
                "  {:<16} {} / {}",
                format!("{}:", life.lifetime),
                format_bytes(life.used_bytes),
                format_bytes(life.capacity_bytes)
            )?;
        }
        Ok(())
    }
}

/// Running counters kept by the allocator state.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub allocation_count: u64,
    pub realloc_count: u64,
    pub abandoned_bytes: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

impl Counters {
    pub fn record_alloc(&mut self, consumed: usize) {
        self.allocation_count += 1;
        self.live_bytes += consumed;
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
    }

    pub fn record_realloc(&mut self, abandoned: usize) {
        self.realloc_count += 1;
        self.abandoned_bytes += abandoned;
    }

    pub fn record_reset(&mut self, released: usize) {
        self.live_bytes = self.live_bytes.saturating_sub(released);
    }
}
