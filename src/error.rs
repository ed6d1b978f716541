//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Fetch functions report
//! failures through `anyhow`; a stored failure is shared between every caller
//! waiting on the same cell via [`SharedError`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// == Shared Error ==
/// A fetch failure handed out to every reader of the same cell.
///
/// The first failed load stores its error once; subsequent readers receive a
/// cheap clone of the same underlying `anyhow::Error`.
#[derive(Debug, Clone)]
pub struct SharedError(Arc<anyhow::Error>);

impl SharedError {
    /// Wraps a fetch error for shared storage.
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    /// The underlying error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for SharedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = self.0.as_ref().as_ref();
        Some(inner)
    }
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// A `must_be_cached` lookup found nothing cached
    #[error("value not cached")]
    NotCached,

    /// The fetch function failed; the caller's error, passed through
    #[error(transparent)]
    Fetch(SharedError),

    /// The fetch function failed and `must` was set
    #[error("fetch error: {0}")]
    FetchFailed(#[source] SharedError),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
