//! In-Memory Cache Store
//!
//! Process-local `CacheStore` with TTL expiration and bounded capacity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, CacheStore, EvictionPolicy, EvictionTracker};
use crate::config::Config;
use crate::entity::Entity;
use crate::error::{Result, StoreError};

struct Inner<E: Entity> {
    entries: HashMap<E::Id, CacheEntry<E>>,
    tracker: Box<dyn EvictionTracker<E::Id>>,
    stats: CacheStats,
}

impl<E: Entity> Inner<E> {
    /// Looks up `id`, dropping it if stale. Updates hit/miss counters.
    fn lookup(&mut self, id: &E::Id) -> Option<E> {
        let found = match self.entries.get(id).map(CacheEntry::is_expired) {
            Some(true) => {
                self.entries.remove(id);
                self.tracker.remove(id);
                self.stats.record_expirations(1);
                self.stats.set_total_entries(self.entries.len());
                None
            }
            Some(false) => self.entries.get(id).map(|entry| entry.entity.clone()),
            None => None,
        };

        if found.is_some() {
            self.tracker.record_read(id);
        }
        self.stats.record_lookup(found.is_some());
        found
    }

    fn insert(&mut self, entity: E, ttl: Option<Duration>, max_entries: usize) {
        let id = entity.id();

        if !self.entries.contains_key(&id) && self.entries.len() >= max_entries {
            if let Some(victim) = self.tracker.evict() {
                self.entries.remove(&victim);
                self.stats.record_eviction();
                debug!(?victim, "Evicted cache entry");
            }
        }

        self.entries.insert(id.clone(), CacheEntry::new(entity, ttl));
        self.tracker.record_write(&id);
        self.stats.set_total_entries(self.entries.len());
    }

    /// Removes the entry, returning true only if it was still live.
    fn remove(&mut self, id: &E::Id) -> bool {
        let live = match self.entries.remove(id) {
            Some(entry) => !entry.is_expired(),
            None => return false,
        };
        self.tracker.remove(id);
        if live {
            self.stats.record_invalidations(1);
        } else {
            self.stats.record_expirations(1);
        }
        self.stats.set_total_entries(self.entries.len());
        live
    }
}

// == Memory Cache Store ==
/// In-process cache guarded by a tokio `RwLock`.
///
/// The store starts connected. `close` drops every entry and makes all
/// operations fail with `StoreError::CacheUnavailable` until `connect` is
/// called again.
pub struct MemoryCacheStore<E: Entity> {
    inner: RwLock<Inner<E>>,
    connected: AtomicBool,
    max_entries: usize,
    default_ttl: Option<Duration>,
}

impl<E: Entity> MemoryCacheStore<E> {
    // == Constructor ==
    /// Creates an LRU cache holding at most `max_entries` entries.
    ///
    /// A `default_ttl` of `None` keeps entries until they are evicted or
    /// invalidated.
    pub fn new(max_entries: usize, default_ttl: Option<Duration>) -> Self {
        Self::with_policy(max_entries, default_ttl, EvictionPolicy::Lru)
    }

    /// Creates a cache using the given eviction policy.
    pub fn with_policy(
        max_entries: usize,
        default_ttl: Option<Duration>,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                tracker: policy.tracker(),
                stats: CacheStats::new(),
            }),
            connected: AtomicBool::new(true),
            max_entries: max_entries.max(1),
            default_ttl,
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_policy(config.max_entries, config.cache_ttl(), config.eviction_policy)
    }

    // == Lifecycle ==
    /// Marks the store as reachable again.
    pub fn connect(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("Cache store connected");
        }
    }

    /// Disconnects the store and drops its contents.
    pub async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let mut inner = self.inner.write().await;
            inner.entries.clear();
            inner.tracker.clear();
            inner.stats.set_total_entries(0);
            info!("Cache store closed");
        }
    }

    /// Returns true while the store accepts operations.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::CacheUnavailable(
                "cache store is closed".to_string(),
            ))
        }
    }

    /// Returns the current number of entries, including stale ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<E: Entity> CacheStore<E> for MemoryCacheStore<E> {
    async fn get(&self, id: &E::Id) -> Result<Option<E>> {
        self.ensure_connected()?;
        // Write lock: reads reorder the eviction tracker and bump counters
        let mut inner = self.inner.write().await;
        Ok(inner.lookup(id))
    }

    async fn get_all(&self, ids: &[E::Id]) -> Result<HashMap<E::Id, E>> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(entity) = inner.lookup(id) {
                found.insert(id.clone(), entity);
            }
        }
        Ok(found)
    }

    async fn put(&self, entity: E) -> Result<()> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        inner.insert(entity, self.default_ttl, self.max_entries);
        Ok(())
    }

    async fn put_all(&self, entities: Vec<E>) -> Result<()> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        for entity in entities {
            inner.insert(entity, self.default_ttl, self.max_entries);
        }
        Ok(())
    }

    async fn fill(&self, entities: Vec<E>) -> Result<usize> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        let mut filled = 0;
        for entity in entities {
            let fresh = inner
                .entries
                .get(&entity.id())
                .map_or(false, |entry| !entry.is_expired());
            if !fresh {
                inner.insert(entity, self.default_ttl, self.max_entries);
                filled += 1;
            }
        }
        Ok(filled)
    }

    async fn invalidate(&self, id: &E::Id) -> Result<bool> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        Ok(inner.remove(id))
    }

    async fn invalidate_many(&self, ids: &[E::Id]) -> Result<usize> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        Ok(ids.iter().filter(|id| inner.remove(id)).count())
    }

    async fn invalidate_all(&self) -> Result<usize> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        let count = inner.entries.values().filter(|entry| !entry.is_expired()).count();
        let expired = inner.entries.len() - count;
        inner.entries.clear();
        inner.tracker.clear();
        inner.stats.record_invalidations(count);
        inner.stats.record_expirations(expired);
        inner.stats.set_total_entries(0);
        Ok(count)
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        self.ensure_connected()?;
        let mut inner = self.inner.write().await;
        let expired: Vec<E::Id> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            inner.entries.remove(id);
            inner.tracker.remove(id);
        }

        let count = expired.len();
        inner.stats.record_expirations(count);
        let remaining = inner.entries.len();
        inner.stats.set_total_entries(remaining);
        Ok(count)
    }

    async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    const TTL: Option<Duration> = Some(Duration::from_secs(300));

    fn product(id: u64) -> Product {
        Product::new(id, format!("item-{}", id), "tools", 100 * id as i64)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);

        cache.put(product(1)).await.unwrap();
        let cached = cache.get(&1).await.unwrap();

        assert_eq!(cached, Some(product(1)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);

        assert_eq!(cache.get(&42).await.unwrap(), None);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_last_write() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);

        cache.put(product(1)).await.unwrap();
        cache.put(product(1).with_price(999)).await.unwrap();

        assert_eq!(cache.get(&1).await.unwrap().unwrap().price_cents, 999);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_all_only_present_keys() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);
        cache.put_all(vec![product(1), product(3)]).await.unwrap();

        let found = cache.get_all(&[1, 2, 3]).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains_key(&1));
        assert!(found.contains_key(&3));
        assert!(!found.contains_key(&2));
    }

    #[tokio::test]
    async fn test_invalidate_reports_existence() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);
        cache.put(product(1)).await.unwrap();

        assert!(cache.invalidate(&1).await.unwrap());
        assert!(!cache.invalidate(&1).await.unwrap());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_many_and_all_count() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);
        cache
            .put_all((1..=5).map(product).collect())
            .await
            .unwrap();

        assert_eq!(cache.invalidate_many(&[1, 2, 9]).await.unwrap(), 2);
        assert_eq!(cache.invalidate_all().await.unwrap(), 3);
        assert_eq!(cache.stats().await.invalidations, 5);
    }

    #[tokio::test]
    async fn test_ttl_expiry_treated_as_absent() {
        let cache = MemoryCacheStore::<Product>::new(100, Some(Duration::from_millis(50)));
        cache.put(product(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get(&1).await.unwrap(), None);
        assert_eq!(cache.stats().await.expirations, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidation_skips_expired_entries() {
        let cache = MemoryCacheStore::<Product>::new(100, Some(Duration::from_millis(50)));
        cache.put_all(vec![product(1), product(2)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.put(product(3)).await.unwrap();

        assert!(!cache.invalidate(&1).await.unwrap());
        assert_eq!(cache.invalidate_all().await.unwrap(), 1);

        let stats = cache.stats().await;
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.expirations, 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_fill_keeps_fresh_entries() {
        let cache = MemoryCacheStore::<Product>::new(100, TTL);
        let newer = Product::new(1, "newer", "tools", 999);
        cache.put(newer.clone()).await.unwrap();

        let filled = cache.fill(vec![product(1), product(2)]).await.unwrap();

        assert_eq!(filled, 1);
        assert_eq!(cache.get(&1).await.unwrap(), Some(newer));
        assert_eq!(cache.get(&2).await.unwrap(), Some(product(2)));
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let cache = MemoryCacheStore::<Product>::new(100, None);
        cache.put(product(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.cleanup_expired().await.unwrap(), 0);
        assert!(cache.get(&1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = MemoryCacheStore::<Product>::new(100, Some(Duration::from_millis(50)));
        cache.put(product(1)).await.unwrap();
        cache.put(product(2)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.cleanup_expired().await.unwrap(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCacheStore::<Product>::new(3, TTL);
        for id in 1..=3 {
            cache.put(product(id)).await.unwrap();
        }

        // Reading 1 makes 2 the eviction candidate
        cache.get(&1).await.unwrap();
        cache.put(product(4)).await.unwrap();

        assert_eq!(cache.len().await, 3);
        assert!(cache.get(&1).await.unwrap().is_some());
        assert!(cache.get(&2).await.unwrap().is_none());
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction() {
        let cache = MemoryCacheStore::<Product>::with_policy(3, TTL, EvictionPolicy::Fifo);
        for id in 1..=3 {
            cache.put(product(id)).await.unwrap();
        }

        cache.get(&1).await.unwrap();
        cache.put(product(4)).await.unwrap();

        assert!(cache.get(&1).await.unwrap().is_none());
        assert!(cache.get(&2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let cache = MemoryCacheStore::<Product>::new(10, TTL);
        cache.put(product(1)).await.unwrap();

        cache.close().await;
        assert!(!cache.is_connected());
        assert!(matches!(
            cache.get(&1).await,
            Err(StoreError::CacheUnavailable(_))
        ));
        assert!(matches!(
            cache.put(product(2)).await,
            Err(StoreError::CacheUnavailable(_))
        ));

        cache.connect();
        assert_eq!(cache.get(&1).await.unwrap(), None);
    }
}
