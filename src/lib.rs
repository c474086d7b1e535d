//! livesync - client-side acceleration and live-sync layer for a
//! file-browsing application.
//!
//! Three cooperating components, wired together by the caller:
//!
//! - [`MemoryCache`]: generic key-value cache with TTL expiry, LRU
//!   eviction and statistics; keys come from [`CacheKeyGenerator`].
//! - [`NavigationCache`]: bidirectional mapping between hierarchical
//!   folder paths and numeric ids, so breadcrumbs and deep links
//!   resolve without a remote round trip.
//! - [`RealtimeChannel`]: resilient push channel receiving server-sent
//!   file-system change events, with reconnect, backoff and heartbeat.
//!
//! The components are deliberately uncoupled: the channel knows nothing
//! about the cache. The composition root registers a channel listener
//! that invalidates the relevant cache prefixes:
//!
//! ```ignore
//! let config = Config::from_env();
//! let cache = Arc::new(RwLock::new(MemoryCache::<serde_json::Value>::new(
//!     config.cache_max_size,
//!     config.cache_default_ttl,
//! )));
//! let _sweep = spawn_cleanup_task(cache.clone(), config.cache_cleanup_interval);
//!
//! let channel = RealtimeChannel::new(ChannelConfig {
//!     url: config.ws_url.clone(),
//!     ..ChannelConfig::default()
//! })?;
//! let cache_for_events = cache.clone();
//! channel.add_event_listener(realtime::WILDCARD, move |event| {
//!     let key = CacheKeyGenerator::files(event.folder_id, &[]);
//!     cache_for_events.blocking_write().delete(&key);
//!     Ok(())
//! });
//! channel.connect();
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod navigation;
pub mod realtime;
pub mod tasks;

pub use cache::{CacheKeyGenerator, CacheStatistics, MemoryCache};
pub use config::Config;
pub use error::{ChannelError, Result};
pub use navigation::NavigationCache;
pub use realtime::{ChannelConfig, ConnectionStatus, FileSystemEvent, RealtimeChannel};
pub use tasks::spawn_cleanup_task;
