//! Cache Facade Module
//!
//! [`LazyCache`] binds one backing store, its lock, and a set of default
//! options, delegating every operation to [`resolve`](crate::store::resolve)
//! with per-call options layered over the defaults.

use std::hash::Hash;

use tracing::debug;

use crate::error::Result;
use crate::options::Options;
use crate::store::{new_store, resolve, SharedStore};

type NoFetch<K, V> = fn(&K) -> anyhow::Result<V>;

// == Lazy Cache ==
/// A cache that owns its backing store and default options.
///
/// Values are loaded at most once per entry by the fetch function passed to
/// [`get`](LazyCache::get), then served from the cache until an expiry
/// policy invalidates them or an eviction policy removes them.
pub struct LazyCache<K, V> {
    store: SharedStore<K, V>,
    defaults: Options<K, V>,
}

impl<K, V> LazyCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache with no default options.
    pub fn new() -> Self {
        Self::with_defaults(Options::default())
    }

    /// Creates a cache whose every operation starts from `defaults`.
    /// Per-call options override them.
    pub fn with_defaults(defaults: Options<K, V>) -> Self {
        Self {
            store: new_store(),
            defaults,
        }
    }

    // == Get ==
    /// Retrieves the value for `key`, loading it with `fetch` at most once.
    pub fn get<F>(&self, key: K, fetch: F) -> Result<Option<V>>
    where
        F: FnOnce(&K) -> anyhow::Result<V>,
    {
        resolve(&self.store, key, Some(fetch), &self.defaults)
    }

    /// [`get`](LazyCache::get) with per-call options layered over the cache
    /// defaults.
    pub fn get_with<F>(&self, key: K, fetch: F, opts: Options<K, V>) -> Result<Option<V>>
    where
        F: FnOnce(&K) -> anyhow::Result<V>,
    {
        let merged = self.defaults.merged_with(&opts);
        resolve(&self.store, key, Some(fetch), &merged)
    }

    // == Lookup ==
    /// Fetch-less resolution: returns the cached value if present.
    pub fn lookup(&self, key: K) -> Result<Option<V>> {
        resolve::<K, V, NoFetch<K, V>>(&self.store, key, None, &self.defaults)
    }

    /// [`lookup`](LazyCache::lookup) with per-call options.
    pub fn lookup_with(&self, key: K, opts: Options<K, V>) -> Result<Option<V>> {
        let merged = self.defaults.merged_with(&opts);
        resolve::<K, V, NoFetch<K, V>>(&self.store, key, None, &merged)
    }

    // == Set ==
    /// Manually writes the value for `key`, bypassing fetch.
    ///
    /// The write respects the cell's once-semantics: an already-loaded entry
    /// keeps its value. Call [`remove`](LazyCache::remove) first to
    /// overwrite.
    pub fn set(&self, key: K, value: V) {
        let opts = self.defaults.clone().set_value(value);
        let _ = resolve::<K, V, NoFetch<K, V>>(&self.store, key, None, &opts);
    }

    // == Remove ==
    /// Removes the entry for `key`, if any.
    pub fn remove(&self, key: K) {
        let opts = self.defaults.clone().clear();
        let _ = resolve::<K, V, NoFetch<K, V>>(&self.store, key, None, &opts);
    }

    // == Size ==
    /// Current number of entries, including entries whose load is still in
    /// flight.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Returns true if an entry exists for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.store.read().contains_key(key)
    }

    // == Purge Expired ==
    /// Removes every loaded entry the cache's default expiry policy reports
    /// expired. A cache without a default expiry never purges anything.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let Some(expiry) = &self.defaults.expiry else {
            return 0;
        };

        let mut map = self.store.write();
        let expired: Vec<K> = map
            .iter()
            .filter(|(_, cell)| cell.is_loaded() && expiry.is_expired(cell))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired.len();
        for key in &expired {
            map.remove(key);
        }
        if count > 0 {
            debug!(count, "purged expired entries");
        }
        count
    }

    // == Store Access ==
    /// The shared backing store, for use with
    /// [`resolve`](crate::store::resolve) directly.
    pub fn store(&self) -> &SharedStore<K, V> {
        &self.store
    }
}

impl<K, V> Default for LazyCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
