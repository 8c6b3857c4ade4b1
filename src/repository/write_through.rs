//! Write-Through Repository
//!
//! Persists every write synchronously, then refreshes the cache with the
//! stored snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::cache::CacheStore;
use crate::entity::Entity;
use crate::error::Result;
use crate::predicate::Predicate;
use crate::repository::options::{with_timeout, CacheFailurePolicy, RepositoryOptions};
use crate::repository::read_through::ReadThroughRepository;
use crate::repository::{Repository, RepositoryStats};
use crate::store::PersistentStore;

// == Write-Through Repository ==
/// Durable write first, cache update second.
///
/// The cache only ever receives snapshots the store has acknowledged, so a
/// failed upsert leaves the cache exactly as it was.
pub struct WriteThroughRepository<E, C, S> {
    reads: ReadThroughRepository<E, C, S>,
}

impl<E, C, S> WriteThroughRepository<E, C, S>
where
    E: Entity,
    C: CacheStore<E>,
    S: PersistentStore<E>,
{
    pub fn new(cache: Arc<C>, store: Arc<S>, options: RepositoryOptions) -> Self {
        Self {
            reads: ReadThroughRepository::new(cache, store, options),
        }
    }

    pub fn reads(&self) -> &ReadThroughRepository<E, C, S> {
        &self.reads
    }

    /// Caches acknowledged snapshots. Under `Degrade`, a failed cache write
    /// falls back to evicting the ids so no older value keeps being served.
    async fn refresh_cache(&self, stored: Vec<E>) -> Result<()> {
        let ids: Vec<E::Id> = stored.iter().map(|e| e.id()).collect();
        let result = match stored.len() {
            1 => self.reads.cache().put(stored[0].clone()).await,
            _ => self.reads.cache().put_all(stored).await,
        };

        let Err(err) = result else {
            return Ok(());
        };
        match self.reads.options().cache_failure_policy {
            CacheFailurePolicy::Fail => Err(err),
            CacheFailurePolicy::Degrade => {
                warn!(count = ids.len(), error = %err, "Cache refresh failed after durable write");
                if let Err(err) = self.reads.cache().invalidate_many(&ids).await {
                    error!(count = ids.len(), error = %err, "Cache may serve stale entries");
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<E, C, S> Repository<E> for WriteThroughRepository<E, C, S>
where
    E: Entity,
    C: CacheStore<E> + 'static,
    S: PersistentStore<E> + 'static,
{
    async fn get(&self, id: &E::Id) -> Result<Option<E>> {
        self.reads.get(id).await
    }

    async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        self.reads.get_all(ids).await
    }

    async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>> {
        self.reads.find_all(predicate).await
    }

    async fn find_fresh_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        self.reads.find_fresh_by_id(id).await
    }

    async fn put(&self, entity: E) -> Result<E> {
        let timeout = self.reads.options().store_timeout;
        let stored = with_timeout(timeout, self.reads.store().upsert(entity)).await?;
        self.refresh_cache(vec![stored.clone()]).await?;
        Ok(stored)
    }

    /// Persists the batch, caching whatever the store acknowledged.
    ///
    /// If any entity failed, the first failure is returned after the
    /// acknowledged ones have been cached.
    async fn put_all(&self, entities: Vec<E>) -> Result<Vec<E>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let timeout = self.reads.options().store_timeout;
        let outcome = with_timeout(timeout, self.reads.store().upsert_all(entities)).await?;

        if !outcome.persisted.is_empty() {
            self.refresh_cache(outcome.persisted.clone()).await?;
        }
        if let Some((entity, err)) = outcome.failed.into_iter().next() {
            warn!(id = ?entity.id(), error = %err, "Batch write partially failed");
            return Err(err);
        }
        Ok(outcome.persisted)
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
            mode: "write-through",
            cache: self.reads.cache_stats().await,
            write_behind: None,
        }
    }
}
