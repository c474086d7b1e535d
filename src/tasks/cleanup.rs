//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache items.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Spawns a background task that periodically sweeps expired items out
/// of the cache.
///
/// The task sleeps for `interval` between sweeps and takes the write
/// lock only for the duration of one pass. Abort the returned handle to
/// stop the sweep; that, together with `MemoryCache::destroy`, is the
/// cache's scoped teardown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(MemoryCache::new(100, Duration::from_secs(300))));
/// let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(
    cache: Arc<RwLock<MemoryCache<T>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "starting cache cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache = cache.write().await;
                cache.cleanup()
            };

            if removed > 0 {
                info!(removed, "cleanup sweep removed expired items");
            } else {
                debug!("cleanup sweep found no expired items");
            }
        }
    })
}
