//! lazycache - an in-memory lazy-loading cache
//!
//! Values are computed at most once per cache entry (single-flight), served
//! from the cache until an expiry policy invalidates them, and bounded in
//! size by a pluggable eviction policy. Repeated hits take a lock-cheap read
//! path; structural changes (insert, replace, evict) serialize on a writer
//! lock that is never held while a fetch function runs.
//!
//! # Example
//!
//! ```
//! use lazycache::LazyCache;
//!
//! let cache: LazyCache<String, u32> = LazyCache::new();
//!
//! // The fetch closure runs once; later gets return the cached value.
//! let value = cache.get("answer".to_string(), |_| Ok(42)).unwrap();
//! assert_eq!(value, Some(42));
//!
//! let cached = cache.get("answer".to_string(), |_| Ok(0)).unwrap();
//! assert_eq!(cached, Some(42));
//! ```

pub mod cache;
pub mod cell;
pub mod error;
pub mod eviction;
pub mod expiry;
pub mod options;
pub mod store;
pub mod sweeper;

#[cfg(test)]
mod property_tests;

pub use cache::LazyCache;
pub use cell::ValueCell;
pub use error::{CacheError, Result, SharedError};
pub use eviction::{
    EvictionPolicy, FifoEviction, LfuEviction, LruEviction, NoEviction, UnorderedEviction,
};
pub use expiry::Expiry;
pub use options::{Options, ReleaseSink};
pub use store::{new_store, resolve, SharedStore};
pub use sweeper::{spawn_sweeper, SweeperHandle};
