//! Cache Statistics Module
//!
//! Tracks cache performance metrics: requests, hits, misses, evictions
//! and sweep runs.

use serde::Serialize;

// == Cache Statistics ==
/// Aggregate performance counters for a [`MemoryCache`](crate::cache::MemoryCache).
///
/// Counters are monotonically increasing and are only reset when the
/// cache itself is reconstructed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatistics {
    /// Total number of `get` calls
    pub total_requests: u64,
    /// Number of successful retrievals
    pub cache_hits: u64,
    /// Number of failed retrievals (key absent or expired)
    pub cache_misses: u64,
    /// Hit rate as a percentage of total requests
    pub hit_rate: f64,
    /// Current number of items in the cache
    pub current_size: usize,
    /// Maximum number of items the cache can hold
    pub max_size: usize,
    /// Items removed by LRU eviction or TTL expiry
    pub evicted_items: u64,
    /// Number of sweep passes that removed at least one item
    pub cleanup_runs: u64,
}

impl CacheStatistics {
    // == Constructor ==
    /// Creates statistics with all counters at zero and the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    // == Record Hit ==
    /// Counts a successful retrieval and refreshes the hit rate.
    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
        self.update_hit_rate();
    }

    // == Record Miss ==
    /// Counts a failed retrieval and refreshes the hit rate.
    pub fn record_miss(&mut self) {
        self.cache_misses += 1;
        self.update_hit_rate();
    }

    // == Record Request ==
    /// Counts an incoming `get` call.
    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    // == Record Eviction ==
    /// Counts one or more items removed by eviction or expiry.
    pub fn record_evictions(&mut self, count: u64) {
        self.evicted_items += count;
    }

    // == Record Cleanup ==
    /// Counts a sweep pass that removed at least one item.
    pub fn record_cleanup_run(&mut self) {
        self.cleanup_runs += 1;
    }

    // == Update Size ==
    /// Updates the current item count.
    pub fn set_current_size(&mut self, size: usize) {
        self.current_size = size;
    }

    /// Recomputes `hit_rate` as `hits / requests * 100`.
    fn update_hit_rate(&mut self) {
        if self.total_requests > 0 {
            self.hit_rate = (self.cache_hits as f64 / self.total_requests as f64) * 100.0;
        }
    }
}
