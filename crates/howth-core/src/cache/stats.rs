use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from memory without computing.
    pub hits: u64,
    /// Computed because neither memory nor the store had the key.
    pub misses: u64,
    /// Waited on another caller's in-flight computation.
    pub coalesced: u64,
    /// Served a remembered failure.
    pub negative_hits: u64,
    pub evictions: u64,
    /// Loaded from the persistent store.
    pub store_hits: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.store_hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    /// Counters accumulated after `earlier` was taken.
    pub fn since(&self, earlier: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            coalesced: self.coalesced.saturating_sub(earlier.coalesced),
            negative_hits: self.negative_hits.saturating_sub(earlier.negative_hits),
            evictions: self.evictions.saturating_sub(earlier.evictions),
            store_hits: self.store_hits.saturating_sub(earlier.store_hits),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) coalesced: AtomicU64,
    pub(crate) negative_hits: AtomicU64,
    pub(crate) evictions: AtomicU64,
    pub(crate) store_hits: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
        }
    }
}
