//! Per-pair lock registry: the linearization point for mutual-match
//! detection.
//!
//! Every swipe and session decision for a pair runs under that pair's
//! mutex — never under a ledger-wide lock, so unrelated pairs proceed in
//! parallel. Acquisition is bounded: a caller that cannot get the lock
//! within the retry budget surfaces a typed transient error instead of
//! queueing forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::warn;

use nearmatch_types::{ConcurrencyConfig, NearmatchError, PairId, Result, constants};

/// One mutex per canonical pair id.
pub struct PairLockRegistry {
    locks: Mutex<HashMap<PairId, Arc<Mutex<()>>>>,
    config: ConcurrencyConfig,
}

impl PairLockRegistry {
    #[must_use]
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Acquire the pair's lock, retrying with linear backoff.
    ///
    /// # Errors
    /// [`NearmatchError::ConcurrencyConflict`] once the retry budget is
    /// exhausted. The caller's write was not applied; the operation is
    /// safe to retry end to end.
    pub async fn acquire(&self, pair: PairId) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(pair).or_insert_with(|| Arc::new(Mutex::new(()))))
        };

        let attempt_timeout = Duration::from_millis(constants::PAIR_LOCK_TIMEOUT_MS);
        for attempt in 0..=self.config.conflict_retries {
            match timeout(attempt_timeout, Arc::clone(&lock).lock_owned()).await {
                Ok(guard) => return Ok(guard),
                Err(_) => {
                    warn!(%pair, attempt, "pair lock contended, backing off");
                    tokio::time::sleep(self.config.retry_backoff * (attempt + 1)).await;
                }
            }
        }
        Err(NearmatchError::ConcurrencyConflict {
            reason: format!("pair lock unavailable for {pair}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use nearmatch_types::AccountId;

    use super::*;

    fn registry() -> PairLockRegistry {
        PairLockRegistry::new(ConcurrencyConfig::default())
    }

    fn make_pair() -> PairId {
        PairId::new(AccountId::new(), AccountId::new())
    }

    #[tokio::test]
    async fn same_pair_is_mutually_exclusive() {
        let registry = Arc::new(registry());
        let pair = make_pair();
        let guard = registry.acquire(pair).await.unwrap();

        let contender = Arc::clone(&registry);
        let handle = tokio::spawn(async move { contender.acquire(pair).await.map(drop) });

        // The contender cannot finish while the guard is held.
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(guard);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn different_pairs_are_independent() {
        let registry = registry();
        let _a = registry.acquire(make_pair()).await.unwrap();
        let _b = registry.acquire(make_pair()).await.unwrap();
    }

    #[tokio::test]
    async fn both_orderings_address_the_same_lock() {
        let registry = Arc::new(registry());
        let a = AccountId::new();
        let b = AccountId::new();
        let guard = registry.acquire(PairId::new(a, b)).await.unwrap();

        let contender = Arc::clone(&registry);
        let handle = tokio::spawn(async move { contender.acquire(PairId::new(b, a)).await.map(drop) });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished(), "reversed pair must hit the same mutex");

        drop(guard);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_a_conflict() {
        let registry = registry();
        let pair = make_pair();
        let _held = registry.acquire(pair).await.unwrap();

        let err = registry.acquire(pair).await.unwrap_err();
        assert!(matches!(err, NearmatchError::ConcurrencyConflict { .. }));
    }
}
