//! The swipe engine: records directed interest and promotes mutual
//! pairs to a match, atomically, exactly once.
//!
//! ## Critical Section
//!
//! Everything between "read the target's likes" and "open the session"
//! runs under the pair's lock. Two users liking each other in the same
//! instant serialize on that lock: the first like lands as one-sided,
//! the second observes it and completes the match. One record, one
//! session, one pass consumed — never zero, never two.
//!
//! ## Who pays
//!
//! The swiper whose like *completes* the mutual pair pays the pass; the
//! first liker pays nothing.

use std::sync::Arc;

use tracing::{debug, info};

use nearmatch_discovery::ProfileStore;
use nearmatch_entitlement::{EntitlementLedger, IdentityResolver};
use nearmatch_session::SessionManager;
use nearmatch_types::{
    AccountId, ActiveMatchSession, ConcurrencyConfig, NearmatchError, PairId, Result, UserProfile,
};

use crate::ledger::MatchLedger;
use crate::pair_lock::PairLockRegistry;

/// Result of one swipe.
#[derive(Debug, Clone)]
pub struct SwipeOutcome {
    pub is_match: bool,
    /// The freshly opened session, on a mutual hit.
    pub session: Option<ActiveMatchSession>,
    /// The swiper's remaining passes, when a pass was consumed.
    pub passes_left: Option<u32>,
}

impl SwipeOutcome {
    fn no_match() -> Self {
        Self {
            is_match: false,
            session: None,
            passes_left: None,
        }
    }
}

/// Orchestrates the swipe ledger, match ledger, entitlement ledger, and
/// session manager under per-pair locks.
pub struct SwipeEngine {
    store: Arc<ProfileStore>,
    matches: Arc<MatchLedger>,
    sessions: Arc<SessionManager>,
    entitlement: Arc<EntitlementLedger>,
    resolver: Arc<dyn IdentityResolver>,
    locks: PairLockRegistry,
}

impl SwipeEngine {
    #[must_use]
    pub fn new(
        store: Arc<ProfileStore>,
        matches: Arc<MatchLedger>,
        sessions: Arc<SessionManager>,
        entitlement: Arc<EntitlementLedger>,
        resolver: Arc<dyn IdentityResolver>,
        concurrency: ConcurrencyConfig,
    ) -> Self {
        Self {
            store,
            matches,
            sessions,
            entitlement,
            resolver,
            locks: PairLockRegistry::new(concurrency),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    #[must_use]
    pub fn matches(&self) -> &Arc<MatchLedger> {
        &self.matches
    }

    /// Record one directed swipe.
    ///
    /// On a like that completes a mutual pair: the seeker's identity is
    /// charged one pass *before* anything is written — swipe sets are
    /// append-only and cannot be rolled back, so a paywalled swipe
    /// leaves no trace and stays retriable. Then the like, the pending
    /// match record, both profiles' match sets, and the session are all
    /// written inside the same pair-lock critical section.
    pub async fn record_swipe(
        &self,
        seeker: AccountId,
        target: AccountId,
        liked: bool,
    ) -> Result<SwipeOutcome> {
        if seeker == target {
            return Err(NearmatchError::SelfSwipeBlocked);
        }
        let pair = PairId::new(seeker, target);
        let _guard = self.locks.acquire(pair).await?;

        let seeker_profile = self.live_profile(seeker).await?;
        let target_profile = self.live_profile(target).await?;
        if seeker_profile.has_swiped(target) {
            return Err(NearmatchError::AlreadySwiped { target });
        }

        if !liked {
            self.store.record_pass(seeker, target).await?;
            debug!(%seeker, %target, "pass recorded");
            return Ok(SwipeOutcome::no_match());
        }

        if !target_profile.liked_ids.contains(&seeker) {
            self.store.record_like(seeker, target).await?;
            debug!(%seeker, %target, "one-sided like recorded");
            return Ok(SwipeOutcome::no_match());
        }

        // Mutual hit: the completing swiper pays.
        let identity = self.resolver.resolve(seeker).await?;
        let passes_left = self.entitlement.consume(&identity).await?;

        self.store.record_like(seeker, target).await?;
        self.matches.insert_pending(pair).await?;
        self.store.add_match(pair).await?;
        let session = self.sessions.create(pair, [seeker, target]).await?;

        info!(%pair, payer = %seeker, passes_left, "mutual match, session opened");
        Ok(SwipeOutcome {
            is_match: true,
            session: Some(session),
            passes_left: Some(passes_left),
        })
    }

    /// Decline from inside the session. Spends nothing, but records the
    /// declined match (the cooldown still applies) and engages the
    /// entitlement lock if the decliner is sitting at zero passes —
    /// the lock is driven by "currently zero", not by which operation
    /// drained the count.
    pub async fn decline_session(&self, pair: PairId, decliner: AccountId) -> Result<()> {
        let _guard = self.locks.acquire(pair).await?;

        self.sessions.decline(pair, decliner).await?;
        self.matches.mark_declined(pair, decliner).await;

        let identity = self.resolver.resolve(decliner).await?;
        if self.entitlement.lock_if_exhausted(&identity).await? {
            debug!(%pair, %decliner, "decliner at zero passes, lock engaged");
        }
        Ok(())
    }

    /// Confirm the meeting. The session manager enforces the designated-
    /// gender capability; on success the match record turns successful.
    pub async fn confirm_meeting(
        &self,
        pair: PairId,
        by: AccountId,
    ) -> Result<ActiveMatchSession> {
        let _guard = self.locks.acquire(pair).await?;

        let profile = self.live_profile(by).await?;
        let session = self.sessions.confirm_meeting(pair, &profile).await?;
        self.matches.mark_successful(pair).await?;
        Ok(session)
    }

    /// Close an overdue session. Safe for both participants' clients to
    /// race; see [`SessionManager::expire`].
    pub async fn expire_session(&self, pair: PairId) -> Result<bool> {
        self.sessions.expire(pair).await
    }

    /// Acknowledge a terminal session, purging its record.
    pub async fn acknowledge_close(
        &self,
        pair: PairId,
    ) -> Result<Option<nearmatch_types::CloseReason>> {
        self.sessions.acknowledge(pair).await
    }

    /// Account deletion: soft-delete the profile and tear down any live
    /// session as partner-gone. Match records stay — they are permanent
    /// and the identity's entitlement state survives independently.
    pub async fn handle_account_deletion(&self, account: AccountId) -> Result<()> {
        self.store.soft_delete(account).await?;
        for pair in self.sessions.active_pairs_for(account).await {
            self.sessions.partner_gone(pair, account).await?;
        }
        info!(%account, "account deleted, live sessions torn down");
        Ok(())
    }

    async fn live_profile(&self, account: AccountId) -> Result<UserProfile> {
        self.store
            .get(account)
            .await
            .filter(|p| !p.is_deleted)
            .ok_or(NearmatchError::ProfileNotFound(account))
    }
}
