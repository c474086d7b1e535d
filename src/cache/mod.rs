//! Cache Module
//!
//! Generic in-memory caching with TTL expiration, LRU eviction,
//! statistics and deterministic cache-key generation.

mod entry;
mod keys;
mod listener;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheItem};
pub use keys::CacheKeyGenerator;
pub use listener::{CacheEventListener, EvictReason};
pub use stats::CacheStatistics;
pub use store::MemoryCache;
