//! Read-Through Repository
//!
//! Serves point and batch reads from the cache, falling back to the
//! persistent store and populating the cache on miss.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::predicate::Predicate;
use crate::repository::options::{with_timeout, CacheFailurePolicy, RepositoryOptions};
use crate::store::PersistentStore;

// == Read-Through Repository ==
/// Cache-aside reads over a `CacheStore` and a `PersistentStore`.
///
/// Holds no state of its own. Concurrent misses for the same id may both
/// reach the store. Misses fill the cache only where no fresh entry exists,
/// so a snapshot read before a concurrent write never replaces the value
/// that write cached. An invalidation landing between the store read and
/// the fill still lets the older snapshot in until its TTL elapses.
pub struct ReadThroughRepository<E, C, S> {
    cache: Arc<C>,
    store: Arc<S>,
    options: RepositoryOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C, S> ReadThroughRepository<E, C, S>
where
    E: Entity,
    C: CacheStore<E>,
    S: PersistentStore<E>,
{
    // == Constructor ==
    pub fn new(cache: Arc<C>, store: Arc<S>, options: RepositoryOptions) -> Self {
        Self {
            cache,
            store,
            options,
            _entity: PhantomData,
        }
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    // == Get ==
    /// Returns the entity, reading through to the store on a cache miss.
    pub async fn get(&self, id: &E::Id) -> Result<Option<E>> {
        if let Some(entity) = self.cached(id).await? {
            trace!(?id, "Cache hit");
            return Ok(Some(entity));
        }

        trace!(?id, "Cache miss");
        let found = with_timeout(self.options.store_timeout, self.store.find_by_id(id)).await?;
        if let Some(entity) = &found {
            self.populate(vec![entity.clone()]).await?;
        }
        Ok(found)
    }

    // == Get All ==
    /// Returns every requested id that exists, each exactly once.
    ///
    /// One cache lookup partitions the ids; the misses go to the store in a
    /// single batch and are cached afterwards.
    pub async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        let mut found = self.cached_many(ids).await?;

        let mut seen = HashSet::with_capacity(ids.len());
        let misses: Vec<E::Id> = ids
            .iter()
            .filter(|id| !found.contains_key(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();

        trace!(hits = found.len(), misses = misses.len(), "Batch cache lookup");
        if misses.is_empty() {
            return Ok(found);
        }

        let fetched: Vec<E> =
            with_timeout(self.options.store_timeout, self.store.find_by_ids(&misses))
                .await?
                .into_iter()
                .filter(|entity| seen.contains(&entity.id()))
                .collect();

        self.populate(fetched.clone()).await?;
        for entity in fetched {
            found.insert(entity.id(), entity);
        }
        Ok(found)
    }

    // == Find All ==
    /// Predicate scan against the store. Results are never cached.
    pub async fn find_all(&self, predicate: Option<&Predicate>) -> Result<Vec<E>> {
        with_timeout(self.options.store_timeout, self.store.find_all(predicate)).await
    }

    // == Find Fresh ==
    /// Reads the durable value, ignoring the cache entirely.
    pub async fn find_fresh_by_id(&self, id: &E::Id) -> Result<Option<E>> {
        with_timeout(self.options.store_timeout, self.store.find_by_id(id)).await
    }

    // == Invalidation ==
    /// Drops the cached mapping so the next read goes to the store.
    pub async fn invalidate(&self, id: &E::Id) -> Result<bool> {
        self.cache.invalidate(id).await
    }

    pub async fn invalidate_many(&self, ids: &[E::Id]) -> Result<usize> {
        self.cache.invalidate_many(ids).await
    }

    pub async fn invalidate_all(&self) -> Result<usize> {
        self.cache.invalidate_all().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // == Cache Access ==
    pub(crate) async fn cached(&self, id: &E::Id) -> Result<Option<E>> {
        match self.cache.get(id).await {
            Ok(entity) => Ok(entity),
            Err(err) => self.on_cache_error(err, "get").map(|_| None),
        }
    }

    pub(crate) async fn cached_many(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        match self.cache.get_all(ids).await {
            Ok(found) => Ok(found),
            Err(err) => self.on_cache_error(err, "get_all").map(|_| HashMap::new()),
        }
    }

    /// Fills the cache after a miss, applying the failure policy.
    pub(crate) async fn populate(&self, entities: Vec<E>) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        match self.cache.fill(entities).await {
            Ok(_) => Ok(()),
            Err(err) => self.on_cache_error(err, "fill"),
        }
    }

    pub(crate) fn on_cache_error(&self, err: StoreError, operation: &'static str) -> Result<()> {
        match self.options.cache_failure_policy {
            CacheFailurePolicy::Degrade => {
                warn!(operation, error = %err, "Cache unavailable, bypassing");
                Ok(())
            }
            CacheFailurePolicy::Fail => Err(err),
        }
    }
}
