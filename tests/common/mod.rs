//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tiered_cache::cache::MemoryCacheStore;
use tiered_cache::models::Product;
use tiered_cache::predicate::Predicate;
use tiered_cache::store::{BatchOutcome, InMemoryStore, PersistentStore, StoreCallCounts};
use tiered_cache::{Result, StoreError};

pub type ProductCache = MemoryCacheStore<Product>;

pub fn product(id: u64, price: i64) -> Product {
    Product::new(id, format!("item-{}", id), "tools", price)
}

/// Cache with room for everything the tests write and a long TTL.
pub fn cache() -> Arc<ProductCache> {
    Arc::new(MemoryCacheStore::new(1000, Some(Duration::from_secs(300))))
}

/// Store preloaded with ids `1..=n`.
pub async fn seeded_store(n: u64) -> Arc<InMemoryStore<Product>> {
    let store = InMemoryStore::new();
    store.seed((1..=n).map(|id| product(id, 100))).await;
    Arc::new(store)
}

// == Fault-Injecting Store ==
/// Delegates to an `InMemoryStore`, failing calls on demand.
///
/// - `fail_next_writes(n)`: the next `n` upsert/upsert_all calls fail with a
///   transient error and store nothing.
/// - `reject_id(id)`: writes for `id` fail permanently, inside a batch only
///   that entity fails.
/// - `set_reads_down(true)`: every read fails with a transient error.
pub struct FaultyStore {
    inner: InMemoryStore<Product>,
    transient_writes: AtomicUsize,
    rejected: Mutex<HashSet<u64>>,
    reads_down: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            transient_writes: AtomicUsize::new(0),
            rejected: Mutex::new(HashSet::new()),
            reads_down: AtomicBool::new(false),
        }
    }

    pub async fn seeded(n: u64) -> Self {
        let store = Self::new();
        store.inner.seed((1..=n).map(|id| product(id, 100))).await;
        store
    }

    pub fn fail_next_writes(&self, n: usize) {
        self.transient_writes.store(n, Ordering::SeqCst);
    }

    pub fn reject_id(&self, id: u64) {
        self.rejected.lock().unwrap().insert(id);
    }

    pub fn accept_id(&self, id: u64) {
        self.rejected.lock().unwrap().remove(&id);
    }

    pub fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> StoreCallCounts {
        self.inner.calls()
    }

    /// Durable row, read straight from the backing store.
    pub async fn row(&self, id: u64) -> Option<Product> {
        self.inner
            .find_all(None)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.id == id)
    }

    fn take_transient(&self) -> bool {
        self.transient_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn is_rejected(&self, id: u64) -> bool {
        self.rejected.lock().unwrap().contains(&id)
    }

    fn check_reads(&self) -> Result<()> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore<Product> for FaultyStore {
    async fn find_by_id(&self, id: &u64) -> Result<Option<Product>> {
        self.check_reads()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[u64]) -> Result<Vec<Product>> {
        self.check_reads()?;
        self.inner.find_by_ids(ids).await
    }

    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<Product>> {
        self.check_reads()?;
        self.inner.find_all(predicate).await
    }

    async fn upsert(&self, entity: Product) -> Result<Product> {
        if self.take_transient() {
            return Err(StoreError::Transient("connection reset".to_string()));
        }
        if self.is_rejected(entity.id) {
            return Err(StoreError::PermanentWrite(format!(
                "constraint violation on {}",
                entity.id
            )));
        }
        self.inner.upsert(entity).await
    }

    async fn upsert_all(&self, entities: Vec<Product>) -> Result<BatchOutcome<Product>> {
        if self.take_transient() {
            return Err(StoreError::Transient("connection reset".to_string()));
        }
        let (rejected, accepted): (Vec<Product>, Vec<Product>) =
            entities.into_iter().partition(|p| self.is_rejected(p.id));

        let mut outcome = self.inner.upsert_all(accepted).await?;
        outcome.failed.extend(rejected.into_iter().map(|p| {
            let err = StoreError::PermanentWrite(format!("constraint violation on {}", p.id));
            (p, err)
        }));
        Ok(outcome)
    }

    async fn delete(&self, id: &u64) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// Polls `condition` every 10ms until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
