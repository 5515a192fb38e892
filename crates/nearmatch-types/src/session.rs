//! Active match session: the ephemeral, time-boxed decide-now state.
//!
//! ## State Machine
//!
//! ```text
//!              ┌──────────────────┐
//!              │      ACTIVE      │
//!              └───┬───┬───┬───┬──┘
//!   confirm        │   │   │   │        all terminal, converging
//!   ┌──────────────┘   │   │   └──────────────┐
//!   ▼                  ▼   ▼                  ▼
//! MEETING_CONFIRMED DECLINED EXPIRED    PARTNER_GONE
//! ```
//!
//! The timer is wall-clock based: `expires_at` is stored, so remaining
//! time is just `expires_at - now` and survives client reconnects.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, PairId};

/// Why a session left the ACTIVE state. All variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// The designated participant confirmed the meeting.
    MeetingConfirmed,
    /// A participant declined ("not interested").
    Declined,
    /// The decide-now window ran out.
    Expired,
    /// The other participant's account vanished mid-session. Tagged
    /// separately from expiry for UI messaging; same teardown.
    PartnerGone,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeetingConfirmed => write!(f, "MEETING_CONFIRMED"),
            Self::Declined => write!(f, "DECLINED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::PartnerGone => write!(f, "PARTNER_GONE"),
        }
    }
}

/// The ephemeral session record for a matched pair.
///
/// Exists only while a Pending or Successful match record exists for the
/// same pair. A closed session keeps `is_active = false` until a
/// participant acknowledges, then is purged from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveMatchSession {
    pub pair: PairId,
    /// Both participants; order carries no meaning.
    pub participants: [AccountId; 2],
    pub created_at: DateTime<Utc>,
    /// Wall-clock deadline for the decide-now window.
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// The participant who confirmed the meeting, if any. Restricted to
    /// the designated gender by the session manager's capability check.
    pub meeting_confirmed_by: Option<AccountId>,
    /// Terminal reason once closed.
    pub close_reason: Option<CloseReason>,
}

impl ActiveMatchSession {
    #[must_use]
    pub fn open(pair: PairId, participants: [AccountId; 2], session_length: Duration) -> Self {
        let now = Utc::now();
        // Configured lengths beyond the calendar clamp to ~100 years.
        let length = chrono::Duration::from_std(session_length)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            pair,
            participants,
            created_at: now,
            expires_at: now + length,
            is_active: true,
            meeting_confirmed_by: None,
            close_reason: None,
        }
    }

    #[must_use]
    pub fn involves(&self, account: AccountId) -> bool {
        self.participants.contains(&account)
    }

    /// Whether the wall-clock deadline has passed. Independent of
    /// `is_active`: an overdue session may not have been closed yet.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Authoritative remaining time, floored at zero. Safe from cold
    /// start: derived from the stored deadline, never a local countdown.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// A transition published on the session event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionTransition {
    Created,
    MeetingConfirmed { by: AccountId },
    Declined { by: AccountId },
    Expired,
    PartnerGone { gone: AccountId },
}

/// An event on the session bus. Carries both participants so that
/// per-participant feeds can filter without a store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub pair: PairId,
    pub participants: [AccountId; 2],
    pub transition: SessionTransition,
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    #[must_use]
    pub fn involves(&self, account: AccountId) -> bool {
        self.participants.contains(&account)
    }
}
