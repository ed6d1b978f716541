//! Cache Store Module
//!
//! The shared backing store and the resolution algorithm that orchestrates
//! lookup, single-flight loading, expiry replacement, and eviction.
//!
//! Two-tier locking keeps repeated hits cheap: a reader/writer lock guards
//! the map's structure, while each cell carries its own mutex for the
//! once-only load. Neither the read nor the write lock is ever held while a
//! fetch function runs.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cell::ValueCell;
use crate::error::{CacheError, Result};
use crate::options::Options;

// == Shared Store ==
/// The backing store: a key-to-cell map fused with its protecting lock.
///
/// Shared behind an `Arc` so release callbacks can keep the map reachable
/// after the resolving call returns. Callers must not mutate the map outside
/// [`resolve`] while concurrent resolutions are possible.
pub type SharedStore<K, V> = Arc<RwLock<HashMap<K, Arc<ValueCell<V>>>>>;

/// Creates an empty shared store for use with [`resolve`].
pub fn new_store<K, V>() -> SharedStore<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}

// == Resolve ==
/// Retrieves or creates the lazy cell for `key` in `store` and resolves it
/// to a value.
///
/// This is the low-level, bare-map entry point; [`LazyCache`](crate::cache::LazyCache)
/// wraps it with an owned store and default options.
///
/// Hits take the read lock only. Structural changes (insert, expiry
/// replacement, refresh, eviction) re-check under the write lock, which is
/// released before any fetch work begins, so a slow fetch for one key never
/// blocks lookups of other keys.
///
/// For a given cell instance at most one fetch is ever in flight and every
/// caller sharing it observes the same outcome. Callers racing across a
/// refresh or expiry replacement may each install a distinct cell and fetch
/// independently; replacement is deliberately not serialized.
///
/// Returns `Ok(None)` for the lookup-only outcomes: a clear, a suppressed
/// fetch with nothing cached and no default, or a miss with no fetch
/// function supplied.
pub fn resolve<K, V, F>(
    store: &SharedStore<K, V>,
    key: K,
    fetch: Option<F>,
    opts: &Options<K, V>,
) -> Result<Option<V>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: FnOnce(&K) -> anyhow::Result<V>,
{
    let key = match &opts.key_override {
        Some(id) => id.clone(),
        None => key,
    };

    if opts.clear {
        store.write().remove(&key);
        debug!("cleared cache entry");
        return Ok(None);
    }

    // Hot read path: repeated hits stay off the write lock.
    let mut resolved: Option<Arc<ValueCell<V>>> = None;
    if !opts.refresh {
        let map = store.read();
        if let Some(existing) = map.get(&key) {
            if !is_expired(opts, existing) {
                resolved = Some(Arc::clone(existing));
            }
        }
    }

    let cell = match resolved {
        Some(cell) => cell,
        None => install_cell(store, &key, opts),
    };

    // Release wiring: a one-shot purge bound to this exact cell instance.
    if let Some(sink) = &opts.release_sink {
        let store = Arc::clone(store);
        let entry_key = key.clone();
        let entry_cell = Arc::clone(&cell);
        sink.arm(Box::new(move || {
            entry_cell.cancel();
            let mut map = store.write();
            if let Some(current) = map.get(&entry_key) {
                // A newer cell under the same key survives a stale release.
                if Arc::ptr_eq(current, &entry_cell) {
                    map.remove(&entry_key);
                    debug!("released cache entry");
                }
            }
        }));
    }

    // Manual write wins over everything else; fetch is never consulted.
    if let Some(value) = &opts.set_value {
        cell.set(value.clone());
        record_access(opts, &key);
        return Ok(Some(value.clone()));
    }

    if let Some(value) = cell.peek() {
        record_access(opts, &key);
        return Ok(Some(value));
    }

    if opts.dont_fetch {
        if opts.must_be_cached {
            return Err(CacheError::NotCached);
        }
        if let Some(default) = &opts.default_value {
            // Returned but not cached.
            return Ok(Some(default.clone()));
        }
        return Ok(None);
    }

    let Some(fetch) = fetch else {
        return Ok(None);
    };

    match cell.load(|| fetch(&key)) {
        Ok(value) => {
            record_access(opts, &key);
            Ok(Some(value))
        }
        Err(err) => {
            if !opts.must {
                if let Some(default) = &opts.default_value {
                    // Overwrite the cached failure so later readers see the
                    // fallback, not the error.
                    cell.store(default.clone());
                    record_access(opts, &key);
                    return Ok(Some(default.clone()));
                }
                return Err(CacheError::Fetch(err));
            }
            Err(CacheError::FetchFailed(err))
        }
    }
}

// == Structural Mutation ==
/// Re-checks under the write lock and installs a cell for `key`, evicting at
/// the size cap when the key is new. The write lock is released before the
/// returned cell is resolved.
fn install_cell<K, V>(store: &SharedStore<K, V>, key: &K, opts: &Options<K, V>) -> Arc<ValueCell<V>>
where
    K: Eq + Hash + Clone,
{
    let mut map = store.write();

    if let Some(existing) = map.get(key) {
        // Double-check: the read-lock view may have been stale.
        if !opts.refresh && !is_expired(opts, existing) {
            return Arc::clone(existing);
        }
        debug!(refresh = opts.refresh, "replacing cache entry");
    } else if let Some(max_size) = opts.max_size {
        if max_size > 0 && map.len() >= max_size {
            evict_one(&mut map, opts);
        }
    }

    let fresh = Arc::new(ValueCell::new());
    map.insert(key.clone(), Arc::clone(&fresh));
    fresh
}

/// Removes one victim chosen by the configured policy, or an arbitrary entry
/// when no policy is configured. A policy that declines leaves the map
/// over-size.
fn evict_one<K, V>(map: &mut HashMap<K, Arc<ValueCell<V>>>, opts: &Options<K, V>)
where
    K: Eq + Hash + Clone,
{
    match &opts.eviction {
        Some(policy) => {
            let live: HashSet<K> = map.keys().cloned().collect();
            if let Some(victim) = policy.select_victim(&live) {
                map.remove(&victim);
                debug!("evicted cache entry");
            }
        }
        None => {
            if let Some(victim) = map.keys().next().cloned() {
                map.remove(&victim);
                debug!("evicted arbitrary cache entry");
            }
        }
    }
}

/// Expiry is consulted only for loaded cells; an in-flight or empty cell is
/// reused as-is.
fn is_expired<K, V>(opts: &Options<K, V>, cell: &ValueCell<V>) -> bool {
    match &opts.expiry {
        Some(policy) => cell.is_loaded() && policy.is_expired(cell),
        None => false,
    }
}

fn record_access<K, V>(opts: &Options<K, V>, key: &K) {
    if let Some(policy) = &opts.eviction {
        policy.record_access(key);
    }
}
