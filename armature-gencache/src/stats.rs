//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters kept by [`GenerationalCache`](crate::GenerationalCache).
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
    regenerations: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    flushes: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_regeneration(&self) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, ok: bool) {
        if ok {
            self.writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Fresh reads
    pub hits: u64,
    /// Reads that found nothing usable, elections excluded
    pub misses: u64,
    /// Stale entries served inside the grace window
    pub stale_hits: u64,
    /// Callers elected to regenerate a stale entry
    pub regenerations: u64,
    /// Successful writes
    pub writes: u64,
    /// Writes the store rejected
    pub write_failures: u64,
    /// Group flushes
    pub flushes: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of reads that returned a value.
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses + self.regenerations;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
