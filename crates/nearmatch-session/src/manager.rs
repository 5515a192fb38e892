//! The session manager: owns session records and drives every state
//! transition.
//!
//! Expiry is wall-clock based and lazily applied: any caller that
//! touches an overdue session closes it, and closing an already-closed
//! session is a no-op, so racing clients cannot error each other.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use nearmatch_types::{
    AccountId, ActiveMatchSession, CloseReason, NearmatchError, PairId, Result, SessionConfig,
    SessionEvent, SessionTransition, UserProfile,
};

use crate::events::SessionBus;

/// Authoritative session state for one pair, as seen by a client that
/// may have been backgrounded or cold-started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Still deciding; `remaining` is server-computed from the stored
    /// deadline.
    Active { remaining: Duration },
    /// Reached a terminal state, not yet acknowledged.
    Closed { reason: CloseReason },
    /// No record: never existed, or already acknowledged and purged.
    Missing,
}

/// Owns the ephemeral session records and the event bus.
pub struct SessionManager {
    sessions: RwLock<HashMap<PairId, ActiveMatchSession>>,
    bus: SessionBus,
    config: SessionConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let bus = SessionBus::new(config.event_capacity);
        Self {
            sessions: RwLock::new(HashMap::new()),
            bus,
            config,
        }
    }

    /// The event bus; clients subscribe here for live propagation.
    #[must_use]
    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a session for a freshly matched pair and notify both
    /// participants. The non-initiating participant is pulled in by the
    /// published `Created` event without any action on their side.
    ///
    /// # Errors
    /// [`NearmatchError::ConcurrencyConflict`] if an active session
    /// already exists for the pair.
    pub async fn create(
        &self,
        pair: PairId,
        participants: [AccountId; 2],
    ) -> Result<ActiveMatchSession> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get_mut(&pair) {
            if existing.is_active {
                if existing.is_overdue(Utc::now()) {
                    // Lazy repair: close the stale session, then reopen.
                    Self::close(&self.bus, existing, CloseReason::Expired, None);
                } else {
                    return Err(NearmatchError::ConcurrencyConflict {
                        reason: format!("session already active for {pair}"),
                    });
                }
            }
        }

        let session = ActiveMatchSession::open(pair, participants, self.config.session_length);
        sessions.insert(pair, session.clone());
        info!(%pair, expires_at = %session.expires_at, "session opened");
        self.bus.publish(SessionEvent {
            pair,
            participants,
            transition: SessionTransition::Created,
            at: session.created_at,
        });
        Ok(session)
    }

    /// Snapshot of the session record, active or closed.
    pub async fn get(&self, pair: PairId) -> Option<ActiveMatchSession> {
        self.sessions.read().await.get(&pair).cloned()
    }

    /// Pairs with a live session involving `account`.
    pub async fn active_pairs_for(&self, account: AccountId) -> Vec<PairId> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_active && s.involves(account))
            .map(|s| s.pair)
            .collect()
    }

    /// Confirm the meeting. Only the designated gender holds this
    /// capability; the write path itself rejects everyone else, the UI
    /// affordance is merely a mirror of this check.
    pub async fn confirm_meeting(
        &self,
        pair: PairId,
        by: &UserProfile,
    ) -> Result<ActiveMatchSession> {
        let mut sessions = self.sessions.write().await;
        let session = Self::live_session(&self.bus, &mut sessions, pair, by.account_id)?;

        if !self.config.can_confirm_meeting(by.gender) {
            return Err(NearmatchError::MeetingConfirmDenied);
        }

        session.meeting_confirmed_by = Some(by.account_id);
        Self::close(
            &self.bus,
            session,
            CloseReason::MeetingConfirmed,
            Some(by.account_id),
        );
        info!(%pair, by = %by.account_id, "meeting confirmed");
        Ok(session.clone())
    }

    /// Decline ("not interested"). Costs no additional entitlement; the
    /// caller records the declined match so the re-surfacing cooldown
    /// still applies.
    pub async fn decline(&self, pair: PairId, by: AccountId) -> Result<ActiveMatchSession> {
        let mut sessions = self.sessions.write().await;
        let session = Self::live_session(&self.bus, &mut sessions, pair, by)?;
        Self::close(&self.bus, session, CloseReason::Declined, Some(by));
        info!(%pair, %by, "session declined");
        Ok(session.clone())
    }

    /// Close an overdue session. Idempotent: returns `Ok(true)` for the
    /// caller that performed the close, `Ok(false)` when the session is
    /// missing, already closed, or not yet due — never an error, because
    /// both participants' clients race to expire the same record.
    pub async fn expire(&self, pair: PairId) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&pair) else {
            return Ok(false);
        };
        if !session.is_active || !session.is_overdue(Utc::now()) {
            return Ok(false);
        }
        Self::close(&self.bus, session, CloseReason::Expired, None);
        info!(%pair, "session expired");
        Ok(true)
    }

    /// Close every overdue session. Any connected caller may run this;
    /// there is no background sweeper.
    pub async fn expire_due(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let mut closed = 0;
        for session in sessions.values_mut() {
            if session.is_active && session.is_overdue(now) {
                Self::close(&self.bus, session, CloseReason::Expired, None);
                closed += 1;
            }
        }
        if closed > 0 {
            debug!(closed, "overdue sessions swept");
        }
        closed
    }

    /// Tear down because the counterparty vanished (account deleted
    /// mid-session). Same shape as expiry, tagged for UI messaging.
    pub async fn partner_gone(&self, pair: PairId, gone: AccountId) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&pair) else {
            return Ok(false);
        };
        if !session.is_active {
            return Ok(false);
        }
        Self::close(&self.bus, session, CloseReason::PartnerGone, Some(gone));
        info!(%pair, %gone, "session closed, partner gone");
        Ok(true)
    }

    /// Acknowledge a terminal session, purging the record. Returns the
    /// close reason, or `None` when there is nothing to acknowledge
    /// (unknown pair, already purged, or still active).
    pub async fn acknowledge(&self, pair: PairId) -> Result<Option<CloseReason>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&pair) {
            Some(session) if !session.is_active => {
                let reason = session.close_reason;
                sessions.remove(&pair);
                debug!(%pair, ?reason, "closed session acknowledged and purged");
                Ok(reason)
            }
            _ => Ok(None),
        }
    }

    /// Authoritative status for a reconnecting client. Lazily closes an
    /// overdue-but-still-active record — this read can write.
    pub async fn session_status(&self, pair: PairId) -> SessionStatus {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&pair) else {
            return SessionStatus::Missing;
        };
        let now = Utc::now();
        if session.is_active {
            if session.is_overdue(now) {
                Self::close(&self.bus, session, CloseReason::Expired, None);
                return SessionStatus::Closed {
                    reason: CloseReason::Expired,
                };
            }
            return SessionStatus::Active {
                remaining: session.remaining(now),
            };
        }
        session.close_reason.map_or(SessionStatus::Missing, |reason| {
            SessionStatus::Closed { reason }
        })
    }

    /// Fetch a session that must be live and involve `account`.
    fn live_session<'a>(
        bus: &SessionBus,
        sessions: &'a mut HashMap<PairId, ActiveMatchSession>,
        pair: PairId,
        account: AccountId,
    ) -> Result<&'a mut ActiveMatchSession> {
        let session = sessions
            .get_mut(&pair)
            .ok_or(NearmatchError::SessionNotFound(pair))?;
        if !session.involves(account) {
            return Err(NearmatchError::NotAParticipant { account, pair });
        }
        if !session.is_active {
            return Err(NearmatchError::SessionClosed(pair));
        }
        if session.is_overdue(Utc::now()) {
            Self::close(bus, session, CloseReason::Expired, None);
            return Err(NearmatchError::SessionClosed(pair));
        }
        Ok(session)
    }

    /// Apply a terminal transition and publish it. Last writer wins on
    /// the flag; callers guard against double-closing.
    fn close(
        bus: &SessionBus,
        session: &mut ActiveMatchSession,
        reason: CloseReason,
        actor: Option<AccountId>,
    ) {
        session.is_active = false;
        session.close_reason = Some(reason);
        let transition = match (reason, actor) {
            (CloseReason::MeetingConfirmed, Some(by)) => SessionTransition::MeetingConfirmed { by },
            (CloseReason::Declined, Some(by)) => SessionTransition::Declined { by },
            (CloseReason::PartnerGone, Some(gone)) => SessionTransition::PartnerGone { gone },
            _ => SessionTransition::Expired,
        };
        bus.publish(SessionEvent {
            pair: session.pair,
            participants: session.participants,
            transition,
            at: Utc::now(),
        });
    }
}

/// Direct record insertion for tests (e.g. backdating deadlines).
#[cfg(any(test, feature = "test-helpers"))]
impl SessionManager {
    pub async fn insert_for_tests(&self, session: ActiveMatchSession) {
        self.sessions.write().await.insert(session.pair, session);
    }
}
