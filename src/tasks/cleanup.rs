//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::entity::Entity;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Lookups already treat stale entries as absent; the sweep only reclaims
/// memory. A failing sweep (e.g. closed cache) is logged and retried on the
/// next tick.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(MemoryCacheStore::<Product>::new(1000, Some(ttl)));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<E, C>(cache: Arc<C>, cleanup_interval: Duration) -> JoinHandle<()>
where
    E: Entity,
    C: CacheStore<E> + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {:?}",
            cleanup_interval
        );

        loop {
            tokio::time::sleep(cleanup_interval).await;

            match cache.cleanup_expired().await {
                Ok(0) => debug!("TTL cleanup: no expired entries found"),
                Ok(removed) => info!("TTL cleanup: removed {} expired entries", removed),
                Err(err) => warn!(error = %err, "TTL cleanup skipped"),
            }
        }
    })
}
