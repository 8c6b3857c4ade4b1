//! Write-Behind Flush Task
//!
//! Hybrid time/size trigger: a cycle runs when the interval elapses or when
//! a writer signals that the pending set crossed its threshold.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::entity::Entity;
use crate::repository::Flusher;
use crate::store::PersistentStore;

/// Spawns the flush loop for a write-behind repository.
///
/// The loop runs until `shutdown` flips to true (or its sender is dropped),
/// then performs one last cycle and exits. A cycle that has started always
/// runs to completion before the loop looks at its triggers again.
pub fn spawn_flush_task<E, C, S>(
    flusher: Arc<Flusher<E, C, S>>,
    flush_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    E: Entity,
    C: CacheStore<E> + 'static,
    S: PersistentStore<E> + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting write-behind flush task with interval of {:?}",
            flush_interval
        );

        let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    flusher.flush_once().await;
                }
                _ = flusher.wait_for_threshold() => {
                    debug!("Flush threshold reached");
                    flusher.flush_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let report = flusher.flush_once().await;
        info!(
            flushed = report.flushed,
            retried = report.retried,
            "Write-behind flush task stopped"
        );
    })
}
