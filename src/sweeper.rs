//! Expiry Sweeper Module
//!
//! Background thread that periodically removes expired cache entries, for
//! callers who want stale entries reclaimed without waiting for the next
//! lookup to notice them.

use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::cache::LazyCache;

// == Sweeper Handle ==
/// Handle to a running sweeper thread.
///
/// Dropping the handle without calling [`stop`](SweeperHandle::stop) signals
/// shutdown but does not wait for the thread to exit.
pub struct SweeperHandle {
    shared: Arc<SweeperShared>,
    thread: Option<JoinHandle<()>>,
}

struct SweeperShared {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to exit.
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn signal_stop(&self) {
        *self.shared.stopped.lock() = true;
        self.shared.wake.notify_all();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

// == Spawn Sweeper ==
/// Spawns a thread that purges expired entries every `interval`.
///
/// The sweep uses the cache's default expiry policy; a cache without one
/// never has anything to purge. Stop the sweeper with
/// [`SweeperHandle::stop`].
pub fn spawn_sweeper<K, V>(cache: Arc<LazyCache<K, V>>, interval: Duration) -> SweeperHandle
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let shared = Arc::new(SweeperShared {
        stopped: Mutex::new(false),
        wake: Condvar::new(),
    });
    let worker_shared = Arc::clone(&shared);

    let thread = thread::spawn(move || {
        info!(interval_ms = interval.as_millis() as u64, "expiry sweeper started");
        loop {
            {
                let mut stopped = worker_shared.stopped.lock();
                if *stopped {
                    break;
                }
                let timeout = worker_shared.wake.wait_for(&mut stopped, interval);
                if *stopped {
                    break;
                }
                if !timeout.timed_out() {
                    // Spurious wakeup; go back to waiting.
                    continue;
                }
            }

            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(removed, "expiry sweep removed entries");
            }
        }
        info!("expiry sweeper stopped");
    });

    SweeperHandle {
        shared,
        thread: Some(thread),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::Expiry;
    use crate::options::Options;
    use std::thread::sleep;

    #[test]
    fn test_sweeper_removes_expired_entries() {
        let cache: Arc<LazyCache<String, i32>> = Arc::new(LazyCache::with_defaults(
            Options::new().expiry(Expiry::After(Duration::from_millis(30))),
        ));
        cache.set("soon".to_string(), 1);

        let handle = spawn_sweeper(Arc::clone(&cache), Duration::from_millis(10));
        sleep(Duration::from_millis(120));

        assert!(cache.is_empty(), "expired entry should have been swept");
        handle.stop();
    }

    #[test]
    fn test_sweeper_preserves_valid_entries() {
        let cache: Arc<LazyCache<String, i32>> = Arc::new(LazyCache::with_defaults(
            Options::new().expiry(Expiry::After(Duration::from_secs(3600))),
        ));
        cache.set("long_lived".to_string(), 1);

        let handle = spawn_sweeper(Arc::clone(&cache), Duration::from_millis(10));
        sleep(Duration::from_millis(60));

        assert_eq!(cache.lookup("long_lived".to_string()).unwrap(), Some(1));
        handle.stop();
    }

    #[test]
    fn test_sweeper_stops_promptly() {
        let cache: Arc<LazyCache<String, i32>> = Arc::new(LazyCache::new());
        let handle = spawn_sweeper(cache, Duration::from_secs(3600));

        // stop() must not wait out the full interval.
        handle.stop();
    }
}
