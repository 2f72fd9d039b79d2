//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the local cache and the cache-aside service against
//! a simple model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::{LocalCache, MemoryCacheStore};
use crate::messaging::InMemoryBroker;
use crate::service::CacheService;
use crate::source::SampleSource;

// == Strategies ==
/// Keys drawn from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,32}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum StoreOp {
    Put { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| StoreOp::Put { key, value }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
        key_strategy().prop_map(|key| StoreOp::Invalidate { key }),
    ]
}

#[derive(Debug, Clone)]
enum ServiceOp {
    Get(String),
    Invalidate(String),
}

fn service_op_strategy() -> impl Strategy<Value = ServiceOp> {
    prop_oneof![
        3 => key_strategy().prop_map(ServiceOp::Get),
        1 => key_strategy().prop_map(ServiceOp::Invalidate),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An unbounded cache behaves exactly like a map: at most one entry per key,
    // last put wins, invalidation removes, hits and misses are counted.
    #[test]
    fn prop_unbounded_cache_matches_map(ops in prop::collection::vec(store_op_strategy(), 1..60)) {
        let mut cache = LocalCache::unbounded();
        let mut model: HashMap<String, String> = HashMap::new();
        let (mut hits, mut misses, mut invalidations) = (0u64, 0u64, 0u64);

        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    cache.put(&key, value.clone());
                    model.insert(key, value);
                }
                StoreOp::Get { key } => {
                    let expected = model.get(&key).cloned();
                    if expected.is_some() { hits += 1 } else { misses += 1 }
                    prop_assert_eq!(cache.get(&key), expected);
                }
                StoreOp::Invalidate { key } => {
                    let was_present = model.remove(&key).is_some();
                    if was_present { invalidations += 1 }
                    prop_assert_eq!(cache.invalidate(&key), was_present);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, misses);
        prop_assert_eq!(stats.invalidations, invalidations);
        prop_assert_eq!(stats.total_entries, model.len());
    }

    // A bounded cache never exceeds its capacity and always keeps the entry
    // it stored last.
    #[test]
    fn prop_capacity_respected(
        capacity in 1usize..8,
        keys in prop::collection::vec(key_strategy(), 1..60),
    ) {
        let mut cache = LocalCache::new(Some(capacity), None);
        let mut new_key_puts = 0u64;

        for key in &keys {
            if cache.peek(key).is_none() {
                new_key_puts += 1;
            }
            cache.put(key, key.clone());
            prop_assert!(cache.len() <= capacity);
            prop_assert!(cache.peek(key).is_some());
        }

        // Entries only leave through eviction here
        let distinct: HashSet<&String> = keys.iter().collect();
        prop_assert_eq!(cache.stats().evictions + cache.len() as u64, new_key_puts);
        prop_assert_eq!(cache.len(), distinct.len().min(capacity));
    }

    // The primary source is reached exactly once per key between
    // invalidations of that key.
    #[test]
    fn prop_one_fetch_per_key_between_invalidations(
        ops in prop::collection::vec(service_op_strategy(), 1..60),
    ) {
        let source = Arc::new(SampleSource::new());
        let service = CacheService::new(
            Arc::new(MemoryCacheStore::new("prop", LocalCache::unbounded())),
            source.clone(),
            Arc::new(InMemoryBroker::default()),
            "cache-invalidation",
        );

        let mut cached: HashSet<String> = HashSet::new();
        let mut expected_fetches = 0u64;

        tokio_test::block_on(async {
            for op in &ops {
                match op {
                    ServiceOp::Get(key) => {
                        if cached.insert(key.clone()) {
                            expected_fetches += 1;
                        }
                        let value = service.get_data(key).await.unwrap();
                        assert_eq!(value, SampleSource::value_for(key));
                    }
                    ServiceOp::Invalidate(key) => {
                        let was_cached = cached.remove(key);
                        assert_eq!(service.invalidate_data(key).await, was_cached);
                    }
                }
            }
        });

        prop_assert_eq!(source.fetch_count(), expected_fetches);
    }
}
