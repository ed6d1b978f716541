//! Value Cell Module
//!
//! A single slot holding a lazily-computed result exactly once. The slot is
//! read under a shared lock on the hot path; a private mutex serializes the
//! one-time load so concurrent callers converge on a single fetch invocation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::error::SharedError;

// == Stored Result ==
/// The record written by a completed load. Immutable once stored, except via
/// [`ValueCell::store`] or replacement of the whole cell.
#[derive(Debug, Clone)]
struct Stored<V> {
    result: Result<V, SharedError>,
    created_at: Instant,
}

// == Value Cell ==
/// Manages a value that is loaded on demand.
///
/// The initialization function passed to [`load`](ValueCell::load) is invoked
/// at most once across the cell's lifetime, even under concurrent access. The
/// load mutex is held while the fetch runs, but the slot lock is not, so
/// [`peek`](ValueCell::peek) stays non-blocking during an in-flight load.
#[derive(Debug)]
pub struct ValueCell<V> {
    slot: RwLock<Option<Stored<V>>>,
    load_lock: Mutex<()>,
    uses: AtomicU64,
    canceled: AtomicBool,
}

impl<V> Default for ValueCell<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ValueCell<V> {
    // == Constructor ==
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            load_lock: Mutex::new(()),
            uses: AtomicU64::new(0),
            canceled: AtomicBool::new(false),
        }
    }

    // == Created At ==
    /// Returns the instant the stored result was written, or `None` if the
    /// cell has not been loaded.
    pub fn created_at(&self) -> Option<Instant> {
        self.slot.read().as_ref().map(|stored| stored.created_at)
    }

    // == Uses ==
    /// Returns the number of times the value has been read.
    pub fn uses(&self) -> u64 {
        self.uses.load(Ordering::Relaxed)
    }

    // == Is Loaded ==
    /// Returns true once a load, set, or forced store has completed.
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    // == Cancel ==
    /// Marks the cell as canceled. A canceled cell is treated as expired by
    /// every expiry policy, regardless of its other conditions.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Returns true if the cell has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

impl<V: Clone> ValueCell<V> {
    // == Load ==
    /// Ensures the value is loaded by executing `fetch` if it hasn't been
    /// loaded yet. Subsequent calls return the stored result, success or
    /// failure alike, without invoking `fetch` again.
    ///
    /// Every read through this method counts as one use. Safe for concurrent
    /// use: under arbitrary concurrent callers exactly one fetch occurs and
    /// all callers observe its result.
    pub fn load<F>(&self, fetch: F) -> Result<V, SharedError>
    where
        F: FnOnce() -> anyhow::Result<V>,
    {
        if let Some(stored) = &*self.slot.read() {
            self.uses.fetch_add(1, Ordering::Relaxed);
            return stored.result.clone();
        }

        let _guard = self.load_lock.lock();
        // Double-check: another caller may have loaded while we waited.
        if let Some(stored) = &*self.slot.read() {
            self.uses.fetch_add(1, Ordering::Relaxed);
            return stored.result.clone();
        }

        let result = fetch().map_err(SharedError::new);
        *self.slot.write() = Some(Stored {
            result: result.clone(),
            created_at: Instant::now(),
        });
        self.uses.fetch_add(1, Ordering::Relaxed);
        result
    }

    // == Set ==
    /// Manually sets the value if the cell hasn't been loaded yet. A no-op on
    /// an already-loaded cell. Does not count as a use.
    pub fn set(&self, value: V) {
        if self.slot.read().is_some() {
            return;
        }
        let _guard = self.load_lock.lock();
        if self.slot.read().is_some() {
            return;
        }
        *self.slot.write() = Some(Stored {
            result: Ok(value),
            created_at: Instant::now(),
        });
    }

    // == Store ==
    /// Forcibly sets the value, bypassing the once-only check. Used to
    /// overwrite a stored failure with a fallback default.
    pub fn store(&self, value: V) {
        *self.slot.write() = Some(Stored {
            result: Ok(value),
            created_at: Instant::now(),
        });
    }

    // == Peek ==
    /// Returns the stored value without blocking and without ever invoking a
    /// fetch. Counts as one use on a hit. A stored failure is not a hit.
    pub fn peek(&self) -> Option<V> {
        match &*self.slot.read() {
            Some(Stored {
                result: Ok(value), ..
            }) => {
                self.uses.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            _ => None,
        }
    }

    // == Stored ==
    /// Returns the stored result, success or failure, without incrementing
    /// the usage counter. `None` if the cell has not been loaded.
    pub fn stored(&self) -> Option<Result<V, SharedError>> {
        self.slot.read().as_ref().map(|stored| stored.result.clone())
    }
}
