//! Permanent match records.
//!
//! A `MatchRecord` is created the instant both directed likes exist for a
//! pair and is never deleted: its creation timestamp drives the 12-hour
//! re-surfacing cooldown, so it must outlive the ephemeral session built
//! from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, PairId};

/// Match outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Both likes exist; the pair is inside (or awaiting) its session.
    Pending,
    /// One side declined during the session.
    Declined,
    /// A meeting was confirmed.
    Successful,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Declined => write!(f, "DECLINED"),
            Self::Successful => write!(f, "SUCCESSFUL"),
        }
    }
}

/// Permanent record of a mutual match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub pair: PairId,
    pub created_at: DateTime<Utc>,
    pub status: MatchStatus,
    /// Set when `status` is [`MatchStatus::Declined`].
    pub declined_by: Option<AccountId>,
}

impl MatchRecord {
    #[must_use]
    pub fn new_pending(pair: PairId) -> Self {
        Self {
            pair,
            created_at: Utc::now(),
            status: MatchStatus::Pending,
            declined_by: None,
        }
    }

    /// Whether this record still blocks the pair from resurfacing in
    /// discovery at `now`, given the configured cooldown window.
    #[must_use]
    pub fn within_cooldown(&self, now: DateTime<Utc>, cooldown: std::time::Duration) -> bool {
        let elapsed = now.signed_duration_since(self.created_at);
        match elapsed.to_std() {
            Ok(elapsed) => elapsed < cooldown,
            // Clock skew put created_at in the future; still cooling down.
            Err(_) => true,
        }
    }
}
