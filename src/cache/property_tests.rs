//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the cache store invariants over arbitrary
//! operation sequences.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crate::cache::{CacheStore, EvictionPolicy, MemoryCacheStore};
use crate::entity::Entity;
use crate::models::Product;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: Option<Duration> = Some(Duration::from_secs(300));

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Put { id: u64, price: i64 },
    Get { id: u64 },
    Invalidate { id: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (1u64..20, 0i64..1000).prop_map(|(id, price)| CacheOp::Put { id, price }),
        (1u64..20).prop_map(|id| CacheOp::Get { id }),
        (1u64..20).prop_map(|id| CacheOp::Invalidate { id }),
    ]
}

fn product(id: u64, price: i64) -> Product {
    Product::new(id, format!("item-{}", id), "tools", price)
}

fn store(max_entries: usize, policy: EvictionPolicy) -> MemoryCacheStore<Product> {
    MemoryCacheStore::with_policy(max_entries, TEST_TTL, policy)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses reported by the stats match what callers observed, and
    // the cache agrees with a plain map model of the same operations.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = store(TEST_MAX_ENTRIES, EvictionPolicy::Lru);
            let mut model: HashMap<u64, i64> = HashMap::new();
            let (mut hits, mut misses) = (0u64, 0u64);

            for op in ops {
                match op {
                    CacheOp::Put { id, price } => {
                        cache.put(product(id, price)).await.unwrap();
                        model.insert(id, price);
                    }
                    CacheOp::Get { id } => {
                        let cached = cache.get(&id).await.unwrap();
                        match model.get(&id) {
                            Some(price) => {
                                hits += 1;
                                prop_assert_eq!(cached.map(|p| p.price_cents), Some(*price));
                            }
                            None => {
                                misses += 1;
                                prop_assert!(cached.is_none());
                            }
                        }
                    }
                    CacheOp::Invalidate { id } => {
                        let existed = cache.invalidate(&id).await.unwrap();
                        prop_assert_eq!(existed, model.remove(&id).is_some());
                    }
                }
            }

            let stats = cache.stats().await;
            prop_assert_eq!(stats.hits, hits);
            prop_assert_eq!(stats.misses, misses);
            prop_assert_eq!(stats.total_entries, model.len());
            Ok(())
        })?;
    }

    // Every cached entity is stored under its own id.
    #[test]
    fn prop_entries_keyed_by_entity_id(
        ids in prop::collection::vec(1u64..50, 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = store(TEST_MAX_ENTRIES, EvictionPolicy::Lru);
            cache
                .put_all(ids.iter().map(|id| product(*id, 1)).collect())
                .await
                .unwrap();

            let found = cache.get_all(&ids).await.unwrap();
            for (key, entity) in &found {
                prop_assert_eq!(*key, entity.id());
            }
            Ok(())
        })?;
    }

    // The cache never holds more than its capacity, whatever the policy.
    #[test]
    fn prop_capacity_enforcement(
        ids in prop::collection::vec(1u64..500, 1..200),
        fifo in any::<bool>()
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let max_entries = 25;
            let policy = if fifo { EvictionPolicy::Fifo } else { EvictionPolicy::Lru };
            let cache = store(max_entries, policy);

            for id in ids {
                cache.put(product(id, 1)).await.unwrap();
                prop_assert!(cache.len().await <= max_entries);
            }
            Ok(())
        })?;
    }

    // With LRU, the entry read most recently survives the next eviction.
    #[test]
    fn prop_lru_read_protects_entry(capacity in 2usize..10, touched in 0usize..10) {
        let touched = (touched % capacity) as u64 + 1;
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = store(capacity, EvictionPolicy::Lru);
            for id in 1..=capacity as u64 {
                cache.put(product(id, 1)).await.unwrap();
            }

            cache.get(&touched).await.unwrap();
            cache.put(product(1000, 1)).await.unwrap();

            prop_assert!(cache.get(&touched).await.unwrap().is_some());
            prop_assert_eq!(cache.stats().await.evictions, 1);
            Ok(())
        })?;
    }
}

// == Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Concurrent writers and readers never observe a torn entity: every read
    // returns a snapshot some writer actually put, stored under its own id.
    #[test]
    fn prop_concurrent_operation_correctness(
        ops in prop::collection::vec(cache_op_strategy(), 10..60)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = Arc::new(store(TEST_MAX_ENTRIES, EvictionPolicy::Lru));
            let written: Vec<(u64, i64)> = ops
                .iter()
                .filter_map(|op| match op {
                    CacheOp::Put { id, price } => Some((*id, *price)),
                    _ => None,
                })
                .collect();

            let mut handles = Vec::new();
            for op in ops {
                let cache = Arc::clone(&cache);
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Put { id, price } => {
                            cache.put(product(id, price)).await.map(|_| None)
                        }
                        CacheOp::Get { id } => cache.get(&id).await,
                        CacheOp::Invalidate { id } => cache.invalidate(&id).await.map(|_| None),
                    }
                }));
            }

            for handle in handles {
                if let Some(read) = handle.await.unwrap().unwrap() {
                    prop_assert!(written.contains(&(read.id, read.price_cents)));
                    prop_assert_eq!(read.name, format!("item-{}", read.id));
                }
            }
            Ok(())
        })?;
    }
}
