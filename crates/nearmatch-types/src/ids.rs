//! Globally unique identifiers used throughout NearMatch.
//!
//! Account ids use UUIDv7 for time-ordered lexicographic sorting.
//! `PairId` is the canonical order-independent key for a two-party
//! relationship; `IdentityKey` anchors entitlement state to a real-world
//! identity rather than a login credential.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Unique identifier for a user account (login credential). Uses UUIDv7
/// for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Extract the embedded timestamp (milliseconds since UNIX epoch) from UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        u64::from_be_bytes([
            0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ])
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// Stable external-verifiable key for a true identity (a verified phone
/// number in production). Distinct from [`AccountId`]:
/// one identity may bind to many accounts over time, and all entitlement
/// state hangs off this key so that credential switching cannot reset it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs: everything but the last four characters hidden.
    #[must_use]
    pub fn masked(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("***{tail}")
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}", self.masked())
    }
}

// ---------------------------------------------------------------------------
// PairId
// ---------------------------------------------------------------------------

/// Canonical order-independent key for a two-party relationship.
///
/// The two account ids are sorted at construction, so `PairId::new(a, b)`
/// and `PairId::new(b, a)` address the same record. Every component that
/// stores per-pair state (match ledger, session store, pair locks) keys on
/// this type, which is what lets them all address the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PairId {
    lo: AccountId,
    hi: AccountId,
}

impl PairId {
    #[must_use]
    pub fn new(a: AccountId, b: AccountId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// The lexicographically smaller member.
    #[must_use]
    pub fn lo(&self) -> AccountId {
        self.lo
    }

    /// The lexicographically larger member.
    #[must_use]
    pub fn hi(&self) -> AccountId {
        self.hi
    }

    #[must_use]
    pub fn contains(&self, account: AccountId) -> bool {
        self.lo == account || self.hi == account
    }

    /// The counterparty of `account`, if `account` is a member.
    #[must_use]
    pub fn other(&self, account: AccountId) -> Option<AccountId> {
        if account == self.lo {
            Some(self.hi)
        } else if account == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lo.0, self.hi.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
