//! Options Module
//!
//! Per-call and default configuration for cache resolution. Each field maps
//! one-to-one to a behavior of [`resolve`](crate::store::resolve), with the
//! documented default applying when the field is left alone.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::eviction::EvictionPolicy;
use crate::expiry::Expiry;

// == Release Sink ==
type ReleaseFn = Box<dyn FnOnce() + Send>;

/// One-shot slot a resolving call arms with a release callback.
///
/// Firing the callback marks the resolved cell canceled and removes the map
/// entry, but only if the entry still refers to that exact cell — a stale
/// release never deletes a newer entry installed for the same key.
#[derive(Clone, Default)]
pub struct ReleaseSink {
    slot: Arc<Mutex<Option<ReleaseFn>>>,
}

impl ReleaseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a resolving call has armed the sink.
    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Fires the callback. At most one invocation has an effect.
    pub fn release(&self) {
        let callback = self.slot.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub(crate) fn arm(&self, callback: ReleaseFn) {
        *self.slot.lock() = Some(callback);
    }
}

// == Options ==
/// Configuration for a single cache resolution.
///
/// Construct with [`Options::new`] and chain the builder methods, or fill
/// the fields directly. A facade merges per-call options over its stored
/// defaults: flags combine with OR, optional fields take the per-call value
/// when present.
#[derive(Clone)]
pub struct Options<K, V> {
    /// Suppress fetching on a miss. Default: false.
    pub dont_fetch: bool,
    /// Fail with [`CacheError::NotCached`](crate::error::CacheError) when
    /// the value is missing and fetching is suppressed. Default: false.
    pub must_be_cached: bool,
    /// Force replacement and refetch of an existing entry. Default: false.
    pub refresh: bool,
    /// Delete the entry and return nothing; skips every other step.
    /// Default: false.
    pub clear: bool,
    /// Wrap fetch errors instead of passing them through. Default: false.
    pub must: bool,
    /// Substitute the lookup key. Default: none.
    pub key_override: Option<K>,
    /// Manually write this value, bypassing fetch. Default: none.
    pub set_value: Option<V>,
    /// Fallback returned on a suppressed-fetch miss, or cached in place of a
    /// fetch failure. Default: none.
    pub default_value: Option<V>,
    /// Structural size cap enforced on insertion. Default: unbounded.
    pub max_size: Option<usize>,
    /// Victim-selection strategy consulted at the size cap. Default: an
    /// arbitrary entry is dropped.
    pub eviction: Option<Arc<dyn EvictionPolicy<K>>>,
    /// Staleness predicate for cached entries. Default: entries never
    /// expire.
    pub expiry: Option<Expiry<V>>,
    /// Sink populated with a cancel/purge callback for the resolved entry.
    /// Default: none.
    pub release_sink: Option<ReleaseSink>,
}

impl<K, V> Default for Options<K, V> {
    fn default() -> Self {
        Self {
            dont_fetch: false,
            must_be_cached: false,
            refresh: false,
            clear: false,
            must: false,
            key_override: None,
            set_value: None,
            default_value: None,
            max_size: None,
            eviction: None,
            expiry: None,
            release_sink: None,
        }
    }
}

impl<K, V> Options<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress fetching on a miss.
    pub fn dont_fetch(mut self) -> Self {
        self.dont_fetch = true;
        self
    }

    /// Error if the value is missing while fetching is suppressed.
    pub fn must_be_cached(mut self) -> Self {
        self.must_be_cached = true;
        self
    }

    /// Force replacement and refetch of an existing entry.
    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    /// Delete the entry instead of resolving it.
    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Wrap fetch errors instead of passing them through.
    pub fn must(mut self) -> Self {
        self.must = true;
        self
    }

    /// Substitute the lookup key.
    pub fn key_override(mut self, key: K) -> Self {
        self.key_override = Some(key);
        self
    }

    /// Manually write a value, bypassing fetch.
    pub fn set_value(mut self, value: V) -> Self {
        self.set_value = Some(value);
        self
    }

    /// Fallback for a suppressed-fetch miss or a fetch failure.
    pub fn default_value(mut self, value: V) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Cap the map size, evicting on insertion once reached.
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Victim-selection strategy to consult at the size cap.
    pub fn eviction(mut self, policy: Arc<dyn EvictionPolicy<K>>) -> Self {
        self.eviction = Some(policy);
        self
    }

    /// Staleness predicate for cached entries.
    pub fn expiry(mut self, policy: Expiry<V>) -> Self {
        self.expiry = Some(policy);
        self
    }

    /// Sink to populate with a cancel/purge callback.
    pub fn release_sink(mut self, sink: ReleaseSink) -> Self {
        self.release_sink = Some(sink);
        self
    }
}

impl<K: Clone, V: Clone> Options<K, V> {
    // == Merge ==
    /// Layers `call` over these defaults. Flags OR together (an option,
    /// once switched on, cannot be switched back off per call); optional
    /// fields take the per-call value when present.
    pub fn merged_with(&self, call: &Options<K, V>) -> Options<K, V> {
        Options {
            dont_fetch: self.dont_fetch || call.dont_fetch,
            must_be_cached: self.must_be_cached || call.must_be_cached,
            refresh: self.refresh || call.refresh,
            clear: self.clear || call.clear,
            must: self.must || call.must,
            key_override: call.key_override.clone().or_else(|| self.key_override.clone()),
            set_value: call.set_value.clone().or_else(|| self.set_value.clone()),
            default_value: call
                .default_value
                .clone()
                .or_else(|| self.default_value.clone()),
            max_size: call.max_size.or(self.max_size),
            eviction: call.eviction.clone().or_else(|| self.eviction.clone()),
            expiry: call.expiry.clone().or_else(|| self.expiry.clone()),
            release_sink: call
                .release_sink
                .clone()
                .or_else(|| self.release_sink.clone()),
        }
    }
}
