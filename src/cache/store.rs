//! Cache Store Module
//!
//! Contract for the key-value cache sitting in front of the persistent store.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::cache::CacheStats;
use crate::entity::Entity;
use crate::error::Result;

// == Cache Store ==
/// Id-keyed cache for a single entity type.
///
/// Lookups never consult the persistent store. Entries past their TTL are
/// reported as absent. Every entry is stored under its entity's own id, so a
/// mapping can never point at a record with a different identifier.
///
/// Implementations must tolerate concurrent callers; racing writers to the
/// same id resolve to whichever write lands last.
#[async_trait]
pub trait CacheStore<E: Entity>: Send + Sync {
    /// Returns the cached entity, if present and fresh.
    async fn get(&self, id: &E::Id) -> Result<Option<E>>;

    /// Returns the fresh cached entities among `ids`; absent ids are omitted.
    async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.get(id).await? {
                found.insert(id.clone(), entity);
            }
        }
        Ok(found)
    }

    /// Caches the entity under its id, replacing any previous mapping.
    async fn put(&self, entity: E) -> Result<()>;

    /// Caches every entity under its id.
    async fn put_all(&self, entities: Vec<E>) -> Result<()> {
        for entity in entities {
            self.put(entity).await?;
        }
        Ok(())
    }

    /// Caches only the entities whose id has no fresh entry, leaving newer
    /// mappings written concurrently in place. Returns how many were cached.
    ///
    /// Read-through misses fill the cache with this, so a store snapshot
    /// fetched before a concurrent write cannot overwrite that write.
    async fn fill(&self, entities: Vec<E>) -> Result<usize> {
        let mut filled = 0;
        for entity in entities {
            if self.get(&entity.id()).await?.is_none() {
                self.put(entity).await?;
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Removes the mapping for `id`. Returns true if one existed.
    async fn invalidate(&self, id: &E::Id) -> Result<bool>;

    /// Removes the mappings for `ids`. Returns how many existed.
    async fn invalidate_many(&self, ids: &[E::Id]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.invalidate(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes every mapping. Returns how many existed.
    async fn invalidate_all(&self) -> Result<usize>;

    /// Drops entries whose TTL elapsed. Returns how many were dropped.
    async fn cleanup_expired(&self) -> Result<usize> {
        Ok(0)
    }

    /// Snapshot of the cache counters.
    async fn stats(&self) -> CacheStats;
}
