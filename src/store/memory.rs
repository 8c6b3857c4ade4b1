//! In-Memory Persistent Store
//!
//! HashMap-backed `PersistentStore` that counts every call it serves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::entity::Entity;
use crate::error::Result;
use crate::predicate::Predicate;
use crate::store::{BatchOutcome, PersistentStore};

// == Call Counts ==
/// Number of calls served per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCallCounts {
    pub find_by_id: u64,
    pub find_by_ids: u64,
    pub find_all: u64,
    pub upsert: u64,
    pub upsert_all: u64,
    pub delete: u64,
}

impl StoreCallCounts {
    /// Calls that read from the store.
    pub fn reads(&self) -> u64 {
        self.find_by_id + self.find_by_ids + self.find_all
    }
}

#[derive(Debug, Default)]
struct Counters {
    find_by_id: AtomicU64,
    find_by_ids: AtomicU64,
    find_all: AtomicU64,
    upsert: AtomicU64,
    upsert_all: AtomicU64,
    delete: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

// == In-Memory Store ==
/// Reference persistent store.
///
/// Transient entities receive ids from an internal sequence. An optional
/// artificial latency makes every call sleep first, which lets callers
/// exercise their timeouts.
#[derive(Debug)]
pub struct InMemoryStore<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
    sequence: AtomicU64,
    counters: Counters,
    latency: Option<Duration>,
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            counters: Counters::default(),
            latency: None,
        }
    }

    /// Adds a fixed delay before every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Loads rows directly, bypassing the call counters.
    pub async fn seed(&self, entities: impl IntoIterator<Item = E>) {
        let mut rows = self.rows.write().await;
        for entity in entities {
            rows.insert(entity.id(), entity);
        }
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> StoreCallCounts {
        let c = &self.counters;
        StoreCallCounts {
            find_by_id: c.find_by_id.load(Ordering::Relaxed),
            find_by_ids: c.find_by_ids.load(Ordering::Relaxed),
            find_all: c.find_all.load(Ordering::Relaxed),
            upsert: c.upsert.load(Ordering::Relaxed),
            upsert_all: c.upsert_all.load(Ordering::Relaxed),
            delete: c.delete.load(Ordering::Relaxed),
        }
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn store_row(&self, rows: &mut HashMap<E::Id, E>, mut entity: E) -> E {
        if entity.is_transient() {
            loop {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                let candidate = entity.clone().with_generated_id(seq);
                if !rows.contains_key(&candidate.id()) {
                    entity = candidate;
                    break;
                }
            }
        }
        rows.insert(entity.id(), entity.clone());
        entity
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> PersistentStore<E> for InMemoryStore<E> {
    async fn find_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        bump(&self.counters.find_by_id);
        self.simulate_latency().await;
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[E::Id]) -> Result<Vec<E>> {
        bump(&self.counters.find_by_ids);
        self.simulate_latency().await;
        let rows = self.rows.read().await;
        let mut found: Vec<E> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = rows.get(id) {
                if !found.iter().any(|e| &e.id() == id) {
                    found.push(entity.clone());
                }
            }
        }
        Ok(found)
    }

    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>> {
        bump(&self.counters.find_all);
        self.simulate_latency().await;
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|e| predicate.map_or(true, |p| p.matches(*e)))
            .cloned()
            .collect())
    }

    async fn upsert(&self, entity: E) -> Result<E> {
        bump(&self.counters.upsert);
        self.simulate_latency().await;
        let mut rows = self.rows.write().await;
        Ok(self.store_row(&mut rows, entity))
    }

    async fn upsert_all(&self, entities: Vec<E>) -> Result<BatchOutcome<E>> {
        bump(&self.counters.upsert_all);
        self.simulate_latency().await;
        let mut rows = self.rows.write().await;
        let persisted = entities
            .into_iter()
            .map(|entity| self.store_row(&mut rows, entity))
            .collect();
        Ok(BatchOutcome {
            persisted,
            failed: Vec::new(),
        })
    }

    async fn delete(&self, id: &E::Id) -> Result<bool> {
        bump(&self.counters.delete);
        self.simulate_latency().await;
        Ok(self.rows.write().await.remove(id).is_some())
    }
}
