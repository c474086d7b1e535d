//! Cache Event Listener Module
//!
//! Observer hooks fired by the cache store on mutation and lookup.
//! A failing hook is logged and isolated; it never aborts the cache
//! operation that triggered it and never prevents other listeners
//! from running.

// == Evict Reason ==
/// Why an item left the cache without an explicit `delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// TTL elapsed
    Ttl,
    /// LRU eviction on an over-capacity insert
    Size,
}

// == Cache Event Listener ==
/// Hooks invoked by [`MemoryCache`](crate::cache::MemoryCache).
///
/// Every hook has a no-op default, so implementors only override the
/// events they care about. Hooks return `anyhow::Result` so failures
/// can be reported without panicking into the cache.
pub trait CacheEventListener<T>: Send + Sync {
    /// Fired after a value is inserted or replaced.
    fn on_set(&self, _key: &str, _data: &T) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired after every `get`, with the hit/miss outcome.
    fn on_get(&self, _key: &str, _hit: bool) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired after an explicit delete removed an item.
    fn on_delete(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired after an item is evicted (TTL or LRU).
    fn on_evict(&self, _key: &str, _reason: EvictReason) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fired after a sweep pass that removed at least one item.
    fn on_cleanup(&self, _items_removed: usize) -> anyhow::Result<()> {
        Ok(())
    }
}
