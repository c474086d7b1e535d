//! Cache Item Module
//!
//! Defines the structure for individual cache items with TTL and access tracking.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Item ==
/// A single cached value together with its bookkeeping metadata.
#[derive(Debug, Clone)]
pub struct CacheItem<T> {
    /// The key this item is stored under
    pub key: String,
    /// The cached payload
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Last read or insertion timestamp (Unix milliseconds)
    pub last_accessed: u64,
}

impl<T> CacheItem<T> {
    // == Constructor ==
    /// Creates a new cache item, stamping both `timestamp` and
    /// `last_accessed` with the current time.
    pub fn new(key: String, data: T, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            key,
            data,
            timestamp: now,
            ttl_ms: ttl.as_millis() as u64,
            access_count: 0,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Checks whether the item's TTL has elapsed.
    ///
    /// An item is live while `now - timestamp <= ttl`; it becomes stale
    /// strictly after the TTL duration has fully elapsed.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms().saturating_sub(self.timestamp) > self.ttl_ms
    }

    // == Touch ==
    /// Records a successful read: bumps the access counter and refreshes
    /// the last-accessed timestamp.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = current_timestamp_ms();
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, clamped at zero once elapsed.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let deadline = self.timestamp + self.ttl_ms;
        deadline.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
