//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to verify the structural invariants that must hold for any
//! sequence of cache operations.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::LazyCache;
use crate::eviction::{EvictionPolicy, FifoEviction, LfuEviction, LruEviction, UnorderedEviction};
use crate::options::Options;

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 8;

// == Strategies ==
/// Generates keys from a small space so operations collide and evictions
/// actually trigger.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e][0-9]".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = i32> {
    0..1000i32
}

/// A sequence of cache operations for invariant checking.
#[derive(Debug, Clone)]
enum CacheOp {
    Get { key: String, value: i32 },
    Set { key: String, value: i32 },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Get { key, value }),
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

/// Builds one of the victim-finding eviction configurations: no policy
/// (arbitrary-entry fallback), unordered, LRU, FIFO, or LFU.
fn eviction_for(choice: u8) -> Option<Arc<dyn EvictionPolicy<String>>> {
    match choice {
        0 => None,
        1 => Some(Arc::new(UnorderedEviction)),
        2 => Some(Arc::new(LruEviction::<String>::new())),
        3 => Some(Arc::new(FifoEviction::<String>::new())),
        _ => Some(Arc::new(LfuEviction::<String>::new())),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations and any victim-finding eviction
    // configuration, the map never exceeds the configured maximum size
    // after an operation completes.
    #[test]
    fn prop_size_never_exceeds_cap(
        ops in prop::collection::vec(cache_op_strategy(), 1..60),
        policy_choice in 0..5u8,
    ) {
        let mut defaults: Options<String, i32> = Options::new().max_size(TEST_MAX_SIZE);
        if let Some(policy) = eviction_for(policy_choice) {
            defaults = defaults.eviction(policy);
        }
        let cache = LazyCache::with_defaults(defaults);

        for op in ops {
            match op {
                CacheOp::Get { key, value } => {
                    let _ = cache.get(key, move |_| Ok(value));
                }
                CacheOp::Set { key, value } => {
                    cache.set(key, value);
                }
                CacheOp::Remove { key } => {
                    cache.remove(key);
                }
            }
            prop_assert!(
                cache.len() <= TEST_MAX_SIZE,
                "size {} exceeded cap {}",
                cache.len(),
                TEST_MAX_SIZE
            );
        }
    }

    // For any key, the first write wins: a second set never changes the
    // cached value.
    #[test]
    fn prop_first_set_wins(key in key_strategy(), first in value_strategy(), second in value_strategy()) {
        let cache: LazyCache<String, i32> = LazyCache::new();

        cache.set(key.clone(), first);
        cache.set(key.clone(), second);

        prop_assert_eq!(cache.lookup(key).unwrap(), Some(first));
    }

    // For any key that exists, a remove followed by a lookup reports the
    // value gone.
    #[test]
    fn prop_remove_deletes_entry(key in key_strategy(), value in value_strategy()) {
        let cache: LazyCache<String, i32> = LazyCache::new();

        cache.set(key.clone(), value);
        prop_assert_eq!(cache.lookup(key.clone()).unwrap(), Some(value));

        cache.remove(key.clone());
        prop_assert_eq!(cache.lookup(key).unwrap(), None);
    }

    // For any sequence of gets, the fetch function runs exactly once per
    // distinct key.
    #[test]
    fn prop_fetch_once_per_distinct_key(keys in prop::collection::vec(key_strategy(), 1..40)) {
        let cache: LazyCache<String, i32> = LazyCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for key in &keys {
            let calls = Arc::clone(&calls);
            let _ = cache.get(key.clone(), move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            });
        }

        let distinct: HashSet<&String> = keys.iter().collect();
        prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
    }
}
