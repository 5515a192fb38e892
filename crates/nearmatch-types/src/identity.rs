//! True identity: the anti-fraud anchor for entitlement state.
//!
//! A `TrueIdentity` outlives any account bound to it. Deleting an account
//! and re-registering with a fresh credential re-attaches to the same
//! identity record, so pass counts and cooldown locks survive credential
//! switching. Identity records are never deleted.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, IdentityKey};

/// Per-identity entitlement state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrueIdentity {
    /// The stable external key (verified phone number in production).
    pub key: IdentityKey,
    /// The account currently active on this identity, if any.
    pub current_account: Option<AccountId>,
    /// Accounts previously bound to this identity, oldest first.
    pub previous_accounts: Vec<AccountId>,
    /// Passes remaining today.
    pub passes_left: u32,
    pub passes_used_today: u32,
    pub matches_today: u32,
    /// Cooldown lock expiry; `None` when unlocked.
    pub locked_until: Option<DateTime<Utc>>,
    pub is_premium: bool,
    /// Local calendar date of the last daily reset.
    pub last_daily_reset: NaiveDate,
    /// The identity's reference timezone as minutes east of UTC; the daily
    /// reset compares calendar dates in this offset.
    pub utc_offset_minutes: i32,
}

impl TrueIdentity {
    #[must_use]
    pub fn new(key: IdentityKey, account: AccountId, initial_passes: u32) -> Self {
        Self {
            key,
            current_account: Some(account),
            previous_accounts: Vec::new(),
            passes_left: initial_passes,
            passes_used_today: 0,
            matches_today: 0,
            locked_until: None,
            is_premium: false,
            last_daily_reset: Utc::now().date_naive(),
            utc_offset_minutes: 0,
        }
    }

    /// Today's date in the identity's reference timezone.
    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        now.with_timezone(&offset).date_naive()
    }

    /// Whether a lock exists and its deadline has passed. The ledger uses
    /// this to apply lazy expiry on read; the state itself is not mutated
    /// here.
    #[must_use]
    pub fn lock_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now >= until)
    }

    /// Repoint this identity at a new account, moving the old one into
    /// history. Pass and lock state are deliberately untouched: this is
    /// the anti-multi-accounting enforcement point.
    pub fn bind_account(&mut self, new_account: AccountId) {
        if let Some(old) = self.current_account.replace(new_account) {
            if old != new_account {
                self.previous_accounts.push(old);
            }
        }
    }
}

/// Authoritative lock state, with server-computed remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub locked: bool,
    /// Zero when unlocked.
    pub remaining: std::time::Duration,
}

impl LockStatus {
    #[must_use]
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            remaining: std::time::Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_identity() -> TrueIdentity {
        TrueIdentity::new(IdentityKey::new("15550001234"), AccountId::new(), 3)
    }

    #[test]
    fn new_identity_defaults() {
        let id = make_identity();
        assert_eq!(id.passes_left, 3);
        assert!(id.locked_until.is_none());
        assert!(!id.is_premium);
        assert!(id.previous_accounts.is_empty());
    }

    #[test]
    fn bind_account_pushes_history() {
        let mut id = make_identity();
        let first = id.current_account.unwrap();
        let second = AccountId::new();

        id.bind_account(second);
        assert_eq!(id.current_account, Some(second));
        assert_eq!(id.previous_accounts, vec![first]);
    }

    #[test]
    fn bind_same_account_is_noop_on_history() {
        let mut id = make_identity();
        let current = id.current_account.unwrap();
        id.bind_account(current);
        assert!(id.previous_accounts.is_empty());
    }

    #[test]
    fn rebind_preserves_entitlement_state() {
        let mut id = make_identity();
        id.passes_left = 0;
        id.locked_until = Some(Utc::now() + chrono::Duration::hours(2));

        id.bind_account(AccountId::new());
        assert_eq!(id.passes_left, 0);
        assert!(id.locked_until.is_some());
    }

    #[test]
    fn lock_elapsed_checks_deadline() {
        let mut id = make_identity();
        let now = Utc::now();
        assert!(!id.lock_elapsed(now));

        id.locked_until = Some(now - chrono::Duration::minutes(1));
        assert!(id.lock_elapsed(now));

        id.locked_until = Some(now + chrono::Duration::minutes(1));
        assert!(!id.lock_elapsed(now));
    }

    #[test]
    fn local_date_respects_offset() {
        let mut id = make_identity();
        // 23:30 UTC on Jan 1st is already Jan 2nd at UTC+2.
        let now = "2026-01-01T23:30:00Z".parse::<DateTime<Utc>>().unwrap();

        id.utc_offset_minutes = 0;
        assert_eq!(id.local_date(now).to_string(), "2026-01-01");

        id.utc_offset_minutes = 120;
        assert_eq!(id.local_date(now).to_string(), "2026-01-02");

        id.utc_offset_minutes = -120;
        assert_eq!(id.local_date(now).to_string(), "2026-01-01");
    }

    #[test]
    fn serde_roundtrip() {
        let id = make_identity();
        let json = serde_json::to_string(&id).unwrap();
        let back: TrueIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(id.key, back.key);
        assert_eq!(id.passes_left, back.passes_left);
    }
}
