//! The entitlement ledger: atomic pass consumption, cooldown locks, and
//! account rebinding, all keyed by true identity.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use nearmatch_types::{
    AccountId, EntitlementConfig, IdentityKey, LockStatus, NearmatchError, Result, TrueIdentity,
};

/// Per-identity pass accounting.
///
/// Every mutation is serialized per identity key: two concurrent consumes
/// by the same true identity observe each other's writes, so a starting
/// count of one can never pay for two matches. Operations on different
/// identities proceed in parallel.
pub struct EntitlementLedger {
    /// All identity records. Never shrinks: identities outlive accounts.
    identities: RwLock<HashMap<IdentityKey, TrueIdentity>>,
    /// One mutex per identity key, the linearization point for
    /// read-modify-write operations.
    key_locks: Mutex<HashMap<IdentityKey, Arc<Mutex<()>>>>,
    config: EntitlementConfig,
}

impl EntitlementLedger {
    #[must_use]
    pub fn new(config: EntitlementConfig) -> Self {
        Self {
            identities: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    async fn key_lock(&self, key: &IdentityKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create the identity on first login, or rebind it when the key is
    /// already on file under a different account. Pass and lock state
    /// are untouched by a rebind.
    pub async fn register(&self, key: IdentityKey, account: AccountId) -> Result<TrueIdentity> {
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let mut identities = self.identities.write().await;
        if let Some(identity) = identities.get_mut(&key) {
            if identity.current_account != Some(account) {
                info!(identity = %key, %account, "rebinding identity to new account");
                identity.bind_account(account);
            }
            return Ok(identity.clone());
        }

        let identity = TrueIdentity::new(key.clone(), account, self.config.free_daily_passes);
        identities.insert(key, identity.clone());
        Ok(identity)
    }

    /// Repoint an existing identity at a new account id, pushing the old
    /// one into history. The anti-multi-accounting enforcement point:
    /// passes, counters, and any live lock ride along unchanged.
    pub async fn rebind(&self, key: &IdentityKey, new_account: AccountId) -> Result<TrueIdentity> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;
        info!(identity = %key, account = %new_account, "rebinding identity");
        identity.bind_account(new_account);
        Ok(identity.clone())
    }

    /// Consume one pass.
    ///
    /// Returns the new remaining count. A decrement that reaches exactly
    /// zero engages the cooldown lock in the same write. Premium
    /// identities never decrement and never lock.
    ///
    /// # Errors
    /// - [`NearmatchError::InsufficientEntitlement`] when already at zero
    ///   (surfaced to the caller for the paywall flow).
    /// - [`NearmatchError::EntitlementLocked`] when passes remain but a
    ///   lock is live (possible after a daily reset during a lock).
    pub async fn consume(&self, key: &IdentityKey) -> Result<u32> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;
        let now = Utc::now();

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;

        Self::apply_daily_reset(identity, now, &self.config);
        Self::clear_elapsed_lock(identity, now, &self.config);

        if identity.is_premium {
            identity.passes_used_today += 1;
            identity.matches_today += 1;
            return Ok(identity.passes_left);
        }

        if identity.passes_left == 0 {
            return Err(NearmatchError::InsufficientEntitlement);
        }
        if let Some(until) = identity.locked_until {
            return Err(NearmatchError::EntitlementLocked {
                remaining_secs: (until - now).num_seconds().max(0),
            });
        }

        identity.passes_left -= 1;
        identity.passes_used_today += 1;
        identity.matches_today += 1;

        if identity.passes_left == 0 {
            let until = now
                + chrono::Duration::from_std(self.config.lock_duration)
                    .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 4));
            identity.locked_until = Some(until);
            info!(identity = %key, %until, "passes exhausted, lock engaged");
        }

        Ok(identity.passes_left)
    }

    /// Authoritative lock state with server-computed remaining time.
    ///
    /// Lazy expiry on read: an elapsed lock is cleared here and at least
    /// one pass restored (premium identities restore the premium
    /// allotment). Calling twice cannot double-restore — the second call
    /// finds no lock to clear.
    pub async fn is_locked(&self, key: &IdentityKey) -> Result<LockStatus> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;
        let now = Utc::now();

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;

        Self::apply_daily_reset(identity, now, &self.config);
        if Self::clear_elapsed_lock(identity, now, &self.config) {
            return Ok(LockStatus::unlocked());
        }

        match identity.locked_until {
            Some(until) => Ok(LockStatus {
                locked: true,
                remaining: (until - now).to_std().unwrap_or_default(),
            }),
            None => Ok(LockStatus::unlocked()),
        }
    }

    /// Apply the daily reset if the identity's local calendar day has
    /// rolled over since the last touch.
    pub async fn reset_daily_if_needed(&self, key: &IdentityKey) -> Result<()> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;
        Self::apply_daily_reset(identity, Utc::now(), &self.config);
        Ok(())
    }

    /// Engage the cooldown lock if the identity currently holds zero
    /// passes and is not already locked. Returns whether a lock was
    /// engaged. Driven by "currently zero passes", independent of which
    /// operation drained the count.
    pub async fn lock_if_exhausted(&self, key: &IdentityKey) -> Result<bool> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;
        let now = Utc::now();

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;

        Self::apply_daily_reset(identity, now, &self.config);
        if identity.is_premium || identity.passes_left > 0 || identity.locked_until.is_some() {
            return Ok(false);
        }

        let until = now
            + chrono::Duration::from_std(self.config.lock_duration)
                .unwrap_or_else(|_| chrono::Duration::days(36_500));
        identity.locked_until = Some(until);
        info!(identity = %key, %until, "zero passes at terminal action, lock engaged");
        Ok(true)
    }

    /// Premium upgrade: clears any live lock and jumps to the premium
    /// allotment. Invoked by the external payment collaborator after it
    /// confirms a completed purchase — the engine never talks to a
    /// payment processor itself.
    pub async fn upgrade_to_premium(&self, key: &IdentityKey) -> Result<TrueIdentity> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;
        identity.is_premium = true;
        identity.locked_until = None;
        identity.passes_left = self.config.premium_daily_passes;
        info!(identity = %key, "upgraded to premium");
        Ok(identity.clone())
    }

    /// Premium downgrade: caps the remaining passes at the free
    /// allotment. A live lock, if any, keeps running.
    pub async fn downgrade(&self, key: &IdentityKey) -> Result<TrueIdentity> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(key)
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))?;
        identity.is_premium = false;
        identity.passes_left = identity.passes_left.min(self.config.free_daily_passes);
        info!(identity = %key, "downgraded from premium");
        Ok(identity.clone())
    }

    /// Read-only snapshot. Does not apply lazy expiry — callers that need
    /// authoritative lock state use [`Self::is_locked`].
    pub async fn get(&self, key: &IdentityKey) -> Result<TrueIdentity> {
        let identities = self.identities.read().await;
        identities
            .get(key)
            .cloned()
            .ok_or_else(|| NearmatchError::IdentityNotFound(key.clone()))
    }

    fn apply_daily_reset(identity: &mut TrueIdentity, now: DateTime<Utc>, cfg: &EntitlementConfig) {
        let today = identity.local_date(now);
        if today > identity.last_daily_reset {
            identity.passes_left = cfg.allotment(identity.is_premium);
            identity.passes_used_today = 0;
            identity.matches_today = 0;
            identity.last_daily_reset = today;
            debug!(identity = %identity.key, %today, "daily allotment reset");
        }
    }

    /// Clear an elapsed lock and restore passes. Returns whether a lock
    /// was cleared.
    fn clear_elapsed_lock(
        identity: &mut TrueIdentity,
        now: DateTime<Utc>,
        cfg: &EntitlementConfig,
    ) -> bool {
        if !identity.lock_elapsed(now) {
            return false;
        }
        identity.locked_until = None;
        identity.passes_left = if identity.is_premium {
            cfg.premium_daily_passes
        } else {
            identity.passes_left.max(1)
        };
        info!(identity = %identity.key, passes = identity.passes_left, "lock elapsed, passes restored");
        true
    }
}

/// Direct record insertion for tests.
#[cfg(any(test, feature = "test-helpers"))]
impl EntitlementLedger {
    pub async fn insert_for_tests(&self, identity: TrueIdentity) {
        let mut identities = self.identities.write().await;
        identities.insert(identity.key.clone(), identity);
    }
}
