//! Write-Behind Repository
//!
//! Updates the cache immediately and persists writes later, in coalesced
//! batches, from a background flush task.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;
use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::predicate::Predicate;
use crate::repository::options::{with_timeout, CacheFailurePolicy, RepositoryOptions};
use crate::repository::pending::{PendingQueue, WriteState};
use crate::repository::read_through::ReadThroughRepository;
use crate::repository::{Repository, RepositoryStats};
use crate::store::{BatchOutcome, PersistentStore};
use crate::tasks::spawn_flush_task;

// == Write-Behind Config ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBehindConfig {
    /// Time between flush cycles
    pub flush_interval: Duration,
    /// Pending writes that trigger a cycle before the interval elapses
    pub flush_threshold: usize,
    /// Pending writes accepted before `put` fails with `QueueFull`
    pub max_pending: usize,
}

impl WriteBehindConfig {
    /// Shortest interval the flush ticker accepts.
    pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

    /// Raises a zero flush interval to `MIN_FLUSH_INTERVAL`.
    pub fn normalized(mut self) -> Self {
        if self.flush_interval < Self::MIN_FLUSH_INTERVAL {
            warn!(
                requested = ?self.flush_interval,
                "Flush interval too short, using {:?}",
                Self::MIN_FLUSH_INTERVAL
            );
            self.flush_interval = Self::MIN_FLUSH_INTERVAL;
        }
        self
    }
}

impl Default for WriteBehindConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(500),
            flush_threshold: 100,
            max_pending: 10_000,
        }
    }
}

// == Flush Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    /// Cycles that found work to do
    pub cycles: u64,
    /// Writes acknowledged by the persistent store
    pub flushed: u64,
    /// Writes returned to pending after a retryable failure
    pub retried: u64,
    /// Writes discarded after a permanent failure
    pub dropped: u64,
    /// Writes waiting for the next cycle
    pub pending: usize,
    /// Writes owned by the running cycle
    pub in_flight: usize,
}

/// Outcome of a single flush cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub attempted: usize,
    pub flushed: usize,
    pub retried: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct FlushCounters {
    cycles: AtomicU64,
    flushed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

// == Flusher ==
/// State shared between the repository and its background flush task.
pub struct Flusher<E: Entity, C, S> {
    queue: Mutex<PendingQueue<E>>,
    cache: Arc<C>,
    store: Arc<S>,
    store_timeout: Duration,
    cycle: Mutex<()>,
    wake: Notify,
    counters: FlushCounters,
}

impl<E, C, S> Flusher<E, C, S>
where
    E: Entity,
    C: CacheStore<E>,
    S: PersistentStore<E>,
{
    fn new(cache: Arc<C>, store: Arc<S>, store_timeout: Duration, max_pending: usize) -> Self {
        Self {
            queue: Mutex::new(PendingQueue::new(max_pending)),
            cache,
            store,
            store_timeout,
            cycle: Mutex::new(()),
            wake: Notify::new(),
            counters: FlushCounters::default(),
        }
    }

    /// Resolves when a writer crossed the flush threshold.
    pub async fn wait_for_threshold(&self) {
        self.wake.notified().await;
    }

    // == Flush Cycle ==
    /// Drains the pending set and persists it as one batch.
    ///
    /// Cycles never overlap. Failed writes return to pending when the error
    /// is retryable and are dropped (and logged) otherwise. A dropped write
    /// is also evicted from the cache unless a newer write for the same id
    /// is pending. Never panics or returns an error: failures stay inside
    /// the queue for the next cycle.
    pub async fn flush_once(&self) -> FlushReport {
        let _cycle = self.cycle.lock().await;

        let batch = self.queue.lock().await.drain();
        if batch.is_empty() {
            return FlushReport::default();
        }

        let attempted = batch.len();
        debug!(batch = attempted, "Write-behind flush started");
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let outcome = match with_timeout(self.store_timeout, self.store.upsert_all(batch.clone()))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if err.is_retryable() => BatchOutcome {
                persisted: Vec::new(),
                failed: batch.iter().cloned().map(|e| (e, err.clone())).collect(),
            },
            Err(err) => {
                warn!(error = %err, "Batch upsert rejected, isolating writes");
                self.upsert_individually(&batch).await
            }
        };

        let report = self.settle(&batch, outcome).await;
        debug!(
            attempted = report.attempted,
            flushed = report.flushed,
            retried = report.retried,
            dropped = report.dropped,
            "Write-behind flush finished"
        );
        report
    }

    async fn upsert_individually(&self, batch: &[E]) -> BatchOutcome<E> {
        let mut outcome = BatchOutcome::default();
        for entity in batch {
            match with_timeout(self.store_timeout, self.store.upsert(entity.clone())).await {
                Ok(stored) => outcome.persisted.push(stored),
                Err(err) => outcome.failed.push((entity.clone(), err)),
            }
        }
        outcome
    }

    async fn settle(&self, batch: &[E], outcome: BatchOutcome<E>) -> FlushReport {
        let mut report = FlushReport {
            attempted: batch.len(),
            ..FlushReport::default()
        };
        let failed_ids: HashSet<E::Id> = outcome.failed.iter().map(|(e, _)| e.id()).collect();
        let mut rejected = Vec::new();

        let mut queue = self.queue.lock().await;
        for entity in batch {
            let id = entity.id();
            if !failed_ids.contains(&id) {
                queue.complete(&id);
                report.flushed += 1;
            }
        }

        for (entity, err) in outcome.failed {
            if err.is_retryable() {
                if queue.requeue(entity) {
                    report.retried += 1;
                }
            } else {
                let id = entity.id();
                queue.complete(&id);
                report.dropped += 1;
                error!(?id, error = %err, "Dropping write-behind entry after permanent failure");
                if queue.state_of(&id) == WriteState::Idle {
                    rejected.push(id);
                }
            }
        }

        // Still under the queue lock: a concurrent put cannot slip a newer
        // value into the cache between the state check and the eviction.
        if !rejected.is_empty() {
            if let Err(err) = self.cache.invalidate_many(&rejected).await {
                warn!(count = rejected.len(), error = %err, "Failed to evict rejected writes from cache");
            }
        }
        drop(queue);

        if report.retried > 0 {
            warn!(retried = report.retried, "Write-behind entries re-queued for retry");
        }

        let c = &self.counters;
        c.flushed.fetch_add(report.flushed as u64, Ordering::Relaxed);
        c.retried.fetch_add(report.retried as u64, Ordering::Relaxed);
        c.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        report
    }

    pub async fn stats(&self) -> FlushStats {
        let queue = self.queue.lock().await;
        let c = &self.counters;
        FlushStats {
            cycles: c.cycles.load(Ordering::Relaxed),
            flushed: c.flushed.load(Ordering::Relaxed),
            retried: c.retried.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            pending: queue.pending_len(),
            in_flight: queue.in_flight_len(),
        }
    }
}

// == Write-Behind Repository ==
/// Cache-first writes with asynchronous, batched persistence.
///
/// Reads see buffered writes before anything cached or stored, so
/// invalidating the cache never resurfaces an older durable value.
/// Invalidation touches the cache only; buffered writes are always flushed.
///
/// Must be created inside a tokio runtime: construction spawns the flush
/// task. Dropping the repository asks the task to run a final flush and stop.
pub struct WriteBehindRepository<E: Entity, C, S> {
    reads: ReadThroughRepository<E, C, S>,
    flusher: Arc<Flusher<E, C, S>>,
    config: WriteBehindConfig,
    shutdown: watch::Sender<bool>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<E, C, S> WriteBehindRepository<E, C, S>
where
    E: Entity,
    C: CacheStore<E> + 'static,
    S: PersistentStore<E> + 'static,
{
    // == Constructor ==
    pub fn new(
        cache: Arc<C>,
        store: Arc<S>,
        options: RepositoryOptions,
        config: WriteBehindConfig,
    ) -> Self {
        let config = config.normalized();
        let flusher = Arc::new(Flusher::new(
            Arc::clone(&cache),
            Arc::clone(&store),
            options.store_timeout,
            config.max_pending,
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = spawn_flush_task(Arc::clone(&flusher), config.flush_interval, shutdown_rx);

        Self {
            reads: ReadThroughRepository::new(cache, store, options),
            flusher,
            config,
            shutdown,
            worker: std::sync::Mutex::new(Some(worker)),
        }
    }

    pub fn reads(&self) -> &ReadThroughRepository<E, C, S> {
        &self.reads
    }

    pub fn config(&self) -> WriteBehindConfig {
        self.config
    }

    /// Runs one flush cycle now, waiting for any running cycle first.
    pub async fn flush_now(&self) -> FlushReport {
        self.flusher.flush_once().await
    }

    pub async fn flush_stats(&self) -> FlushStats {
        self.flusher.stats().await
    }

    pub async fn write_state(&self, id: &E::Id) -> WriteState {
        self.flusher.queue.lock().await.state_of(id)
    }

    // == Shutdown ==
    /// Stops the flush task after its final cycle, then flushes whatever the
    /// task could not.
    pub async fn shutdown(&self) -> FlushReport {
        let _ = self.shutdown.send(true);
        let worker = self
            .worker
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or(None);
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                error!(error = %err, "Write-behind flush task ended abnormally");
            }
        }
        let report = self.flusher.flush_once().await;
        info!("Write-behind repository shut down");
        report
    }

    fn reject_transient(entity: &E) -> Result<()> {
        if entity.is_transient() {
            return Err(StoreError::InvalidRequest(
                "write-behind requires entities with an assigned id".to_string(),
            ));
        }
        Ok(())
    }

    fn cache_policy(&self) -> CacheFailurePolicy {
        self.reads.options().cache_failure_policy
    }

    fn maybe_wake(&self, pending: usize) {
        if pending >= self.config.flush_threshold {
            self.flusher.wake.notify_one();
        }
    }
}

impl<E: Entity, C, S> Drop for WriteBehindRepository<E, C, S> {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[async_trait]
impl<E, C, S> Repository<E> for WriteBehindRepository<E, C, S>
where
    E: Entity,
    C: CacheStore<E> + 'static,
    S: PersistentStore<E> + 'static,
{
    async fn get(&self, id: &E::Id) -> Result<Option<E>> {
        let buffered = self.flusher.queue.lock().await.lookup(id).cloned();
        if buffered.is_some() {
            return Ok(buffered);
        }
        self.reads.get(id).await
    }

    async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        let mut found = HashMap::new();
        {
            let queue = self.flusher.queue.lock().await;
            for id in ids {
                if let Some(entity) = queue.lookup(id) {
                    found.insert(id.clone(), entity.clone());
                }
            }
        }

        let rest: Vec<E::Id> = ids
            .iter()
            .filter(|id| !found.contains_key(*id))
            .cloned()
            .collect();
        if !rest.is_empty() {
            for (id, entity) in self.reads.get_all(&rest).await? {
                found.entry(id).or_insert(entity);
            }
        }
        Ok(found)
    }

    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>> {
        self.reads.find_all(predicate).await
    }

    async fn find_fresh_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        self.reads.find_fresh_by_id(id).await
    }

    async fn put(&self, entity: E) -> Result<E> {
        Self::reject_transient(&entity)?;
        let id = entity.id();

        // Queue lock is held across the cache write so a rollback cannot
        // clobber a concurrent writer.
        let mut queue = self.flusher.queue.lock().await;
        let previous = queue.enqueue(entity.clone())?;

        if let Err(err) = self.reads.cache().put(entity.clone()).await {
            match self.cache_policy() {
                CacheFailurePolicy::Degrade => {
                    warn!(?id, error = %err, "Cache update failed, write stays buffered");
                }
                CacheFailurePolicy::Fail => {
                    queue.restore(&id, previous);
                    return Err(err);
                }
            }
        }

        let pending = queue.pending_len();
        drop(queue);
        self.maybe_wake(pending);
        Ok(entity)
    }

    async fn put_all(&self, entities: Vec<E>) -> Result<Vec<E>> {
        for entity in &entities {
            Self::reject_transient(entity)?;
        }
        if entities.is_empty() {
            return Ok(entities);
        }

        let mut queue = self.flusher.queue.lock().await;
        let replaced = queue.enqueue_all(entities.clone())?;

        if let Err(err) = self.reads.cache().put_all(entities.clone()).await {
            match self.cache_policy() {
                CacheFailurePolicy::Degrade => {
                    warn!(count = entities.len(), error = %err, "Cache update failed, writes stay buffered");
                }
                CacheFailurePolicy::Fail => {
                    for (id, previous) in replaced.into_iter().rev() {
                        queue.restore(&id, previous);
                    }
                    return Err(err);
                }
            }
        }

        let pending = queue.pending_len();
        drop(queue);
        self.maybe_wake(pending);
        Ok(entities)
    }

    async fn invalidate(&self, id: &E::Id) -> Result<bool> {
        self.reads.invalidate(id).await
    }

    async fn invalidate_many(&self, ids: &[E::Id]) -> Result<usize> {
        self.reads.invalidate_many(ids).await
    }

    async fn invalidate_all(&self) -> Result<usize> {
        self.reads.invalidate_all().await
    }

    async fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            mode: "write-behind",
            cache: self.reads.cache_stats().await,
            write_behind: Some(self.flush_stats().await),
        }
    }
}
