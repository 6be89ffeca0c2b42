//! TTL Cleanup Task
//!
//! Background task that periodically removes expired assets from a shared cache.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that periodically purges expired cache entries.
///
/// Lookups already drop expired entries on sight; the sweep reclaims memory
/// held by entries nobody asks for again. Abort the returned handle to stop it.
///
/// # Example
/// ```ignore
/// let manager = AssetManager::from_config(&config);
/// let cleanup = spawn_cleanup_task(manager.cache().clone(), config.cleanup_period());
/// // Later, during shutdown:
/// cleanup.abort();
/// ```
pub fn spawn_cleanup_task(cache: SharedCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, "starting asset cache cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, name) = {
                let mut cache_guard = cache.write().await;
                (cache_guard.purge_expired(), cache_guard.name().to_string())
            };

            if removed > 0 {
                info!(cache = %name, removed, "purged expired assets");
            } else {
                debug!(cache = %name, "no expired assets to purge");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, ExpiringCache, ManualClock};
    use std::sync::Arc;

    fn shared_cache() -> (SharedCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = ExpiringCache::with_clock("cleanup", CacheConfig::default(), clock.clone());
        (cache.shared(), clock)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let (cache, clock) = shared_cache();
        {
            let mut cache_guard = cache.write().await;
            cache_guard.set_with_ttl("/stale.png", b"old".to_vec(), Duration::from_secs(1));
            cache_guard.set_with_ttl("/fresh.png", b"new".to_vec(), Duration::from_secs(3600));
        }
        clock.advance(Duration::from_secs(2));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        {
            let cache_guard = cache.read().await;
            assert_eq!(cache_guard.len(), 1);
            assert_eq!(cache_guard.stats().expirations, 1);
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (cache, _) = shared_cache();

        let handle = spawn_cleanup_task(cache, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
