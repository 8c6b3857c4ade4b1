//! Persistent Store Contract

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::predicate::Predicate;

// == Batch Outcome ==
/// Result of a batch upsert that may partially fail.
#[derive(Debug, Clone)]
pub struct BatchOutcome<E> {
    /// Entities as persisted, with store-assigned fields resolved
    pub persisted: Vec<E>,
    /// Submitted entities that were not persisted, with the reason
    pub failed: Vec<(E, StoreError)>,
}

impl<E> BatchOutcome<E> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<E> Default for BatchOutcome<E> {
    fn default() -> Self {
        Self {
            persisted: Vec::new(),
            failed: Vec::new(),
        }
    }
}

// == Persistent Store ==
/// Authoritative storage for one entity type.
///
/// `upsert` must be idempotent: the write-behind flush may deliver the same
/// snapshot more than once.
#[async_trait]
pub trait PersistentStore<E: Entity>: Send + Sync {
    /// Point lookup.
    async fn find_by_id(&self, id: &E::Id) -> Result<Option<E>>;

    /// Batch lookup. Missing ids are simply absent; order is unspecified.
    async fn find_by_ids(&self, ids: &[E::Id]) -> Result<Vec<E>>;

    /// Scan, optionally filtered.
    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>>;

    /// Inserts or replaces the entity and returns it as stored.
    async fn upsert(&self, entity: E) -> Result<E>;

    /// Upserts every entity, collecting per-entity failures.
    ///
    /// An `Err` means nothing in the batch is known to be persisted.
    async fn upsert_all(&self, entities: Vec<E>) -> Result<BatchOutcome<E>> {
        let mut outcome = BatchOutcome::default();
        for entity in entities {
            match self.upsert(entity.clone()).await {
                Ok(stored) => outcome.persisted.push(stored),
                Err(err) => outcome.failed.push((entity, err)),
            }
        }
        Ok(outcome)
    }

    /// Removes the entity. Returns true if it existed.
    async fn delete(&self, id: &E::Id) -> Result<bool>;
}
