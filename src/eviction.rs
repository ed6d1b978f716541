//! Eviction Policy Module
//!
//! Victim-selection strategies consulted when the map reaches its configured
//! maximum size. Stateful policies keep their own bookkeeping behind an
//! internal lock; access notifications arrive outside any lock the cache
//! holds. Bookkeeping may lag the live map, so selection discards tracked
//! keys that are no longer present.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;

// == Eviction Policy Trait ==
/// Strategy for removing entries when the map reaches its maximum size.
pub trait EvictionPolicy<K>: Send + Sync {
    /// Called after every read or write that resolves to a cached value.
    /// Invoked outside the map lock; stateful implementations must
    /// synchronize internally.
    fn record_access(&self, key: &K);

    /// Returns the key to evict out of the currently live key set, or `None`
    /// if the policy declines to pick one. Called while the cache holds
    /// exclusive access to the map.
    fn select_victim(&self, live: &HashSet<K>) -> Option<K>;
}

// == Unordered Eviction ==
/// Evicts an arbitrary live key. No eviction order guarantee.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnorderedEviction;

impl<K> EvictionPolicy<K> for UnorderedEviction
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn record_access(&self, _key: &K) {}

    fn select_victim(&self, live: &HashSet<K>) -> Option<K> {
        live.iter().next().cloned()
    }
}

// == No Eviction ==
/// Never selects a victim, turning a configured maximum size into an
/// unenforced soft cap.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEviction;

impl<K> EvictionPolicy<K> for NoEviction {
    fn record_access(&self, _key: &K) {}

    fn select_victim(&self, _live: &HashSet<K>) -> Option<K> {
        None
    }
}

// == LRU Eviction ==
/// Least-recently-used eviction.
///
/// Keys are kept in a recency deque where the front is the most recently
/// used. Accessing a key moves it to the front, inserting it first if new.
/// The victim is popped from the back, skipping tracked keys that have left
/// the map; if tracking is empty while the map is not, any live key may be
/// returned.
#[derive(Debug, Default)]
pub struct LruEviction<K> {
    order: Mutex<VecDeque<K>>,
}

impl<K> LruEviction<K> {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
        }
    }
}

impl<K> EvictionPolicy<K> for LruEviction<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn record_access(&self, key: &K) {
        let mut order = self.order.lock();
        order.retain(|tracked| tracked != key);
        order.push_front(key.clone());
    }

    fn select_victim(&self, live: &HashSet<K>) -> Option<K> {
        let mut order = self.order.lock();
        while let Some(candidate) = order.pop_back() {
            // Discard keys removed from the map behind our back.
            if live.contains(&candidate) {
                return Some(candidate);
            }
        }
        live.iter().next().cloned()
    }
}

// == FIFO Eviction ==
/// First-in-first-out eviction.
///
/// Identical structure to [`LruEviction`], but a key is tracked only on
/// first sight and never reordered on repeat access. The victim is the
/// oldest inserted key still live.
#[derive(Debug, Default)]
pub struct FifoEviction<K> {
    order: Mutex<VecDeque<K>>,
}

impl<K> FifoEviction<K> {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
        }
    }
}

impl<K> EvictionPolicy<K> for FifoEviction<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn record_access(&self, key: &K) {
        let mut order = self.order.lock();
        if order.iter().any(|tracked| tracked == key) {
            return;
        }
        order.push_front(key.clone());
    }

    fn select_victim(&self, live: &HashSet<K>) -> Option<K> {
        let mut order = self.order.lock();
        while let Some(candidate) = order.pop_back() {
            if live.contains(&candidate) {
                return Some(candidate);
            }
        }
        live.iter().next().cloned()
    }
}

// == LFU Eviction ==
/// Least-frequently-used eviction.
///
/// Keeps a per-key access counter. Selection scans the live key set for the
/// minimum frequency, ties broken by enumeration order, and drops the
/// victim's counter. The scan is O(size) by design.
#[derive(Debug, Default)]
pub struct LfuEviction<K> {
    counts: Mutex<HashMap<K, u64>>,
}

impl<K> LfuEviction<K> {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> EvictionPolicy<K> for LfuEviction<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn record_access(&self, key: &K) {
        let mut counts = self.counts.lock();
        *counts.entry(key.clone()).or_insert(0) += 1;
    }

    fn select_victim(&self, live: &HashSet<K>) -> Option<K> {
        let mut counts = self.counts.lock();

        let mut victim: Option<(K, u64)> = None;
        for key in live {
            let frequency = counts.get(key).copied().unwrap_or(0);
            match &victim {
                Some((_, lowest)) if frequency >= *lowest => {}
                _ => victim = Some((key.clone(), frequency)),
            }
        }

        let (key, _) = victim?;
        counts.remove(&key);
        Some(key)
    }
}
