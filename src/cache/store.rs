//! Memory Cache Module
//!
//! Main cache engine: HashMap storage with per-item TTL expiry,
//! capacity-bounded LRU eviction and statistics. Misses, expiry and
//! absence are encoded in return values, never errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheEventListener, CacheItem, CacheStatistics, EvictReason};

// == Memory Cache ==
/// Generic in-memory cache with TTL expiry and LRU eviction.
///
/// All mutation is synchronous; the composition root wraps the cache in
/// `Arc<RwLock<_>>` when it needs to share it with the background sweep
/// task (see [`spawn_cleanup_task`](crate::tasks::spawn_cleanup_task)).
pub struct MemoryCache<T> {
    /// Key-value storage
    items: HashMap<String, CacheItem<T>>,
    /// Performance statistics
    stats: CacheStatistics,
    /// Maximum number of items allowed
    max_size: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Registered event listeners
    listeners: Vec<Arc<dyn CacheEventListener<T>>>,
}

impl<T: Clone> MemoryCache<T> {
    // == Constructor ==
    /// Creates a new cache with the given capacity and default TTL.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            items: HashMap::new(),
            stats: CacheStatistics::new(max_size),
            max_size,
            default_ttl,
            listeners: Vec::new(),
        }
    }

    // == Set ==
    /// Inserts or replaces a value under `key`.
    ///
    /// Replacing resets the item's timestamps and access counter. When
    /// the cache is at capacity and `key` is new, the least recently
    /// used item is evicted first; inserting under an existing key never
    /// evicts.
    pub fn set(&mut self, key: impl Into<String>, data: T, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);

        if self.items.len() >= self.max_size && !self.items.contains_key(&key) {
            self.evict_lru();
        }

        let item = CacheItem::new(key.clone(), data, ttl);
        self.items.insert(key.clone(), item);
        self.stats.set_current_size(self.items.len());

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
        if let Some(item) = self.items.get(&key) {
            let data = &item.data;
            self.notify("on_set", |l| l.on_set(&key, data));
        }
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// A present-but-expired item is removed on this read and counted as
    /// both a miss and an eviction. A hit refreshes the item's access
    /// metadata.
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.stats.record_request();

        let is_expired = match self.items.get(key) {
            Some(item) => item.is_expired(),
            None => {
                self.stats.record_miss();
                debug!(key = %key, "cache miss");
                self.notify("on_get", |l| l.on_get(key, false));
                return None;
            }
        };

        if is_expired {
            self.items.remove(key);
            self.stats.set_current_size(self.items.len());
            self.stats.record_miss();
            self.stats.record_evictions(1);
            debug!(key = %key, "cache expired");
            self.notify("on_evict", |l| l.on_evict(key, EvictReason::Ttl));
            self.notify("on_get", |l| l.on_get(key, false));
            return None;
        }

        let data = {
            let item = self.items.get_mut(key)?;
            item.touch();
            item.data.clone()
        };
        self.stats.record_hit();
        debug!(key = %key, "cache hit");
        self.notify("on_get", |l| l.on_get(key, true));
        Some(data)
    }

    // == Has ==
    /// Checks whether `key` is present and live.
    ///
    /// Applies the same expiry check as `get` (removing a stale item)
    /// but does not touch the hit/miss statistics.
    pub fn has(&mut self, key: &str) -> bool {
        let is_expired = match self.items.get(key) {
            Some(item) => item.is_expired(),
            None => return false,
        };

        if is_expired {
            self.delete(key);
            return false;
        }
        true
    }

    // == Delete ==
    /// Removes an item by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let existed = self.items.remove(key).is_some();
        if existed {
            self.stats.set_current_size(self.items.len());
            debug!(key = %key, "cache delete");
            self.notify("on_delete", |l| l.on_delete(key));
        }
        existed
    }

    // == Clear ==
    /// Removes all items.
    pub fn clear(&mut self) {
        let size = self.items.len();
        self.items.clear();
        self.stats.set_current_size(0);
        debug!(removed = size, "cache clear");
    }

    // == Clear By Prefix ==
    /// Removes every item whose key starts with `prefix` (literal string
    /// prefix, no pattern matching). Returns the number removed.
    pub fn clear_by_prefix(&mut self, prefix: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.items.len();
        self.stats.set_current_size(self.items.len());
        debug!(prefix = %prefix, removed, "cache clear by prefix");
        removed
    }

    // == Cleanup ==
    /// One sweep pass: removes every expired item, batching eviction
    /// notifications. `cleanup_runs` is incremented only when the pass
    /// removed at least one item.
    pub fn cleanup(&mut self) -> usize {
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| item.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let removed = expired.len();
        for key in &expired {
            self.items.remove(key);
            self.notify("on_evict", |l| l.on_evict(key, EvictReason::Ttl));
        }

        if removed > 0 {
            self.stats.set_current_size(self.items.len());
            self.stats.record_evictions(removed as u64);
            self.stats.record_cleanup_run();
            self.notify("on_cleanup", |l| l.on_cleanup(removed));
            debug!(removed, "cache cleanup removed expired items");
        }
        removed
    }

    // == Statistics ==
    /// Returns an owned snapshot of the current statistics.
    pub fn statistics(&self) -> CacheStatistics {
        let mut stats = self.stats.clone();
        stats.set_current_size(self.items.len());
        stats
    }

    // == Listeners ==
    /// Registers an event listener.
    pub fn add_listener(&mut self, listener: Arc<dyn CacheEventListener<T>>) {
        self.listeners.push(listener);
    }

    /// Removes a previously registered listener (pointer identity).
    pub fn remove_listener(&mut self, listener: &Arc<dyn CacheEventListener<T>>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    // == Destroy ==
    /// Scoped teardown: clears all items and drops all listeners. The
    /// background sweep is owned by its `JoinHandle` and is stopped by
    /// aborting that handle.
    pub fn destroy(&mut self) {
        self.clear();
        self.listeners.clear();
    }

    // == Length ==
    /// Returns the current number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the cache holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the configured capacity.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Evicts the item with the smallest `last_accessed` among all
    /// resident items. Strict less-than keeps the first-encountered
    /// minimum, so ties resolve deterministically per scan.
    fn evict_lru(&mut self) {
        let mut oldest: Option<(String, u64)> = None;
        for (key, item) in &self.items {
            let is_older = oldest
                .as_ref()
                .map_or(true, |(_, t)| item.last_accessed < *t);
            if is_older {
                oldest = Some((key.clone(), item.last_accessed));
            }
        }

        if let Some((key, _)) = oldest {
            self.items.remove(&key);
            self.stats.record_evictions(1);
            debug!(key = %key, "cache lru eviction");
            self.notify("on_evict", |l| l.on_evict(&key, EvictReason::Size));
        }
    }

    /// Invokes `hook` on every listener, logging and swallowing failures
    /// so one listener can never break the operation or its peers.
    fn notify<F>(&self, hook: &str, f: F)
    where
        F: Fn(&dyn CacheEventListener<T>) -> anyhow::Result<()>,
    {
        for listener in &self.listeners {
            if let Err(err) = f(listener.as_ref()) {
                warn!(hook = %hook, error = %err, "cache listener hook failed");
            }
        }
    }
}
