//! Expiry Policy Module
//!
//! Staleness predicates evaluated against a cell's metadata. Policies are
//! composable through [`Expiry::All`] and [`Expiry::Any`]; a canceled cell is
//! unconditionally expired for every variant.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::cell::ValueCell;

// == Expiry Policy ==
/// Decides whether a cached cell is stale.
///
/// Policies observe cell metadata only; they never own entries and never
/// trigger work themselves. The cache consults the policy on lookup and
/// replaces entries it reports expired.
#[derive(Clone)]
pub enum Expiry<V> {
    /// Never expires.
    Never,
    /// Expired once wall-clock time is past the deadline.
    At(DateTime<Utc>),
    /// Expired once the given duration has elapsed since the result was
    /// stored. A cell with no stored result is never expired by this policy
    /// alone.
    After(Duration),
    /// Expired once the cell has been read `n` times. Reads that check
    /// expiry also count, so the n-th read makes the next access observe the
    /// entry as expired.
    AfterUses(u64),
    /// Expired only when every listed policy reports expired. An empty list
    /// never expires.
    All(Vec<Expiry<V>>),
    /// Expired when at least one listed policy reports expired. An empty
    /// list never expires.
    Any(Vec<Expiry<V>>),
    /// Delegates to a caller-supplied predicate.
    Custom(Arc<dyn Fn(&ValueCell<V>) -> bool + Send + Sync>),
    /// Expired once the token has been cancelled.
    WhenCancelled(CancellationToken),
}

impl<V> Expiry<V> {
    // == Is Expired ==
    /// Evaluates the policy against a cell. A canceled cell is expired no
    /// matter the variant.
    pub fn is_expired(&self, cell: &ValueCell<V>) -> bool {
        if cell.is_canceled() {
            return true;
        }
        match self {
            Expiry::Never => false,
            Expiry::At(deadline) => Utc::now() > *deadline,
            Expiry::After(ttl) => match cell.created_at() {
                Some(created) => created.elapsed() > *ttl,
                None => false,
            },
            Expiry::AfterUses(limit) => cell.uses() >= *limit,
            Expiry::All(policies) => {
                !policies.is_empty() && policies.iter().all(|p| p.is_expired(cell))
            }
            Expiry::Any(policies) => policies.iter().any(|p| p.is_expired(cell)),
            Expiry::Custom(predicate) => predicate(cell),
            Expiry::WhenCancelled(token) => token.is_cancelled(),
        }
    }

    // == Custom Constructor ==
    /// Builds a `Custom` policy from a predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&ValueCell<V>) -> bool + Send + Sync + 'static,
    {
        Expiry::Custom(Arc::new(predicate))
    }
}

impl<V> fmt::Debug for Expiry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Never => write!(f, "Never"),
            Expiry::At(deadline) => f.debug_tuple("At").field(deadline).finish(),
            Expiry::After(ttl) => f.debug_tuple("After").field(ttl).finish(),
            Expiry::AfterUses(limit) => f.debug_tuple("AfterUses").field(limit).finish(),
            Expiry::All(policies) => f.debug_tuple("All").field(policies).finish(),
            Expiry::Any(policies) => f.debug_tuple("Any").field(policies).finish(),
            Expiry::Custom(_) => write!(f, "Custom"),
            Expiry::WhenCancelled(_) => write!(f, "WhenCancelled"),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn loaded_cell(value: i32) -> ValueCell<i32> {
        let cell = ValueCell::new();
        cell.set(value);
        cell
    }

    #[test]
    fn test_never() {
        let cell = loaded_cell(1);
        assert!(!Expiry::Never.is_expired(&cell));
    }

    #[test]
    fn test_canceled_cell_always_expired() {
        let cell = loaded_cell(1);
        cell.cancel();

        assert!(Expiry::Never.is_expired(&cell));
        assert!(Expiry::After(Duration::from_secs(3600)).is_expired(&cell));
        assert!(Expiry::<i32>::All(vec![]).is_expired(&cell));
    }

    #[test]
    fn test_at_deadline() {
        let cell = loaded_cell(1);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(!Expiry::At(future).is_expired(&cell));

        let past = Utc::now() - chrono::Duration::hours(1);
        assert!(Expiry::At(past).is_expired(&cell));
    }

    #[test]
    fn test_after_elapsed() {
        let cell = loaded_cell(1);
        let policy = Expiry::After(Duration::from_millis(40));

        assert!(!policy.is_expired(&cell));
        sleep(Duration::from_millis(60));
        assert!(policy.is_expired(&cell));
    }

    #[test]
    fn test_after_unloaded_cell_never_expires() {
        let cell: ValueCell<i32> = ValueCell::new();
        assert!(!Expiry::After(Duration::from_nanos(1)).is_expired(&cell));
    }

    #[test]
    fn test_after_uses_threshold() {
        let cell = loaded_cell(1);
        let policy = Expiry::AfterUses(2);

        assert!(!policy.is_expired(&cell));
        let _ = cell.peek();
        assert!(!policy.is_expired(&cell));
        let _ = cell.peek();
        assert!(policy.is_expired(&cell));
    }

    #[test]
    fn test_all_requires_every_policy() {
        let cell = loaded_cell(1);
        let _ = cell.peek(); // uses = 1

        let satisfied = Expiry::AfterUses(1);
        let unsatisfied = Expiry::After(Duration::from_secs(3600));

        assert!(!Expiry::All(vec![satisfied.clone(), unsatisfied.clone()]).is_expired(&cell));
        assert!(Expiry::All(vec![satisfied.clone(), Expiry::AfterUses(1)]).is_expired(&cell));
        assert!(Expiry::Any(vec![satisfied, unsatisfied]).is_expired(&cell));
    }

    #[test]
    fn test_empty_compositions_never_expire() {
        let cell = loaded_cell(1);
        assert!(!Expiry::All(vec![]).is_expired(&cell));
        assert!(!Expiry::Any(vec![]).is_expired(&cell));
    }

    #[test]
    fn test_custom_predicate() {
        let cell = loaded_cell(1);
        let by_uses = Expiry::custom(|cell: &ValueCell<i32>| cell.uses() > 0);

        assert!(!by_uses.is_expired(&cell));
        let _ = cell.peek();
        assert!(by_uses.is_expired(&cell));
    }

    #[test]
    fn test_when_cancelled_tracks_token() {
        let cell = loaded_cell(1);
        let token = CancellationToken::new();
        let policy = Expiry::WhenCancelled(token.clone());

        assert!(!policy.is_expired(&cell));
        token.cancel();
        assert!(policy.is_expired(&cell));
    }
}
