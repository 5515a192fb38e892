//! End-to-end integration tests across all planes.
//!
//! These tests exercise the full engine lifecycle:
//! Discovery -> Swipe Ledger -> Match Detection -> Session -> Entitlement
//!
//! They verify that the planes work together correctly in realistic
//! scenarios: mutual matching under concurrency, cooldown-driven
//! discovery filtering, decision asymmetry, expiry races, and identity
//! rebinding.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::timeout;

use nearmatch_discovery::{
    AlwaysPresent, DiscoveryEngine, LocationProvider, ProfileStore, RecentMatchIndex,
    StaticLocationProvider,
};
use nearmatch_entitlement::{DeterministicResolver, EntitlementLedger, IdentityResolver};
use nearmatch_matchcore::{MatchLedger, SwipeEngine};
use nearmatch_session::{SessionManager, SessionStatus};
use nearmatch_types::{
    AccountId, CloseReason, EngineConfig, Gender, GeoPoint, IdentityKey, LocationFix,
    MatchStatus, NearmatchError, PairId, SessionTransition, UserProfile,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Resolver backed by an explicit account → identity map, for scenarios
/// where two accounts share one true identity (credential switching).
#[derive(Default)]
struct MapResolver {
    map: std::sync::Mutex<HashMap<AccountId, IdentityKey>>,
}

impl MapResolver {
    fn bind(&self, account: AccountId, key: IdentityKey) {
        self.map.lock().expect("resolver map").insert(account, key);
    }
}

#[async_trait]
impl IdentityResolver for MapResolver {
    async fn resolve(&self, account: AccountId) -> nearmatch_types::Result<IdentityKey> {
        self.map
            .lock()
            .expect("resolver map")
            .get(&account)
            .cloned()
            .ok_or_else(|| NearmatchError::ExternalUnavailable {
                service: "identity-verification".into(),
                reason: format!("no identity on file for {account}"),
            })
    }
}

/// Full engine stack wired the way the presentation layer would wire it.
struct Stack {
    store: Arc<ProfileStore>,
    matches: Arc<MatchLedger>,
    sessions: Arc<SessionManager>,
    entitlement: Arc<EntitlementLedger>,
    location: Arc<StaticLocationProvider>,
    resolver: Arc<MapResolver>,
    discovery: DiscoveryEngine,
    engine: Arc<SwipeEngine>,
}

impl Stack {
    fn new() -> Self {
        init_tracing();
        let config = EngineConfig::default();
        let store = Arc::new(ProfileStore::new(config.discovery.geohash_precision));
        let matches = Arc::new(MatchLedger::new());
        let sessions = Arc::new(SessionManager::new(config.session.clone()));
        let entitlement = Arc::new(EntitlementLedger::new(config.entitlement.clone()));
        let location = Arc::new(StaticLocationProvider::new());
        let resolver = Arc::new(MapResolver::default());

        let discovery = DiscoveryEngine::new(
            Arc::clone(&store),
            Arc::clone(&matches) as Arc<dyn RecentMatchIndex>,
            Arc::clone(&location) as Arc<dyn LocationProvider>,
            Arc::new(AlwaysPresent),
            config.discovery.clone(),
        );
        let engine = Arc::new(SwipeEngine::new(
            Arc::clone(&store),
            Arc::clone(&matches),
            Arc::clone(&sessions),
            Arc::clone(&entitlement),
            Arc::clone(&resolver) as Arc<dyn IdentityResolver>,
            config.concurrency.clone(),
        ));

        Self {
            store,
            matches,
            sessions,
            entitlement,
            location,
            resolver,
            discovery,
            engine,
        }
    }

    /// Onboard a user: profile, location fix, identity registration.
    async fn onboard(&self, gender: Gender, age: u32, lat: f64, lon: f64) -> AccountId {
        let profile = UserProfile::dummy(gender, age, lat, lon);
        let account = profile.account_id;
        self.location
            .set(
                account,
                LocationFix {
                    point: GeoPoint::new(lat, lon).expect("test coordinates"),
                    accuracy_m: 10.0,
                },
            )
            .await;
        self.store.upsert(profile).await.expect("profile upsert");

        let key = DeterministicResolver::derive(account);
        self.resolver.bind(account, key.clone());
        self.entitlement
            .register(key, account)
            .await
            .expect("identity registration");
        account
    }

    async fn identity_of(&self, account: AccountId) -> IdentityKey {
        self.resolver.resolve(account).await.expect("bound identity")
    }

    async fn set_passes(&self, account: AccountId, passes: u32) {
        let key = self.identity_of(account).await;
        let mut identity = self.entitlement.get(&key).await.expect("identity");
        identity.passes_left = passes;
        identity.locked_until = None;
        self.entitlement.insert_for_tests(identity).await;
    }
}

#[tokio::test]
async fn full_cycle_discover_swipe_match_notify() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;

    // Discovery shows each to the other.
    let hits = stack.discovery.discover(her, 20).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].account, him);

    // Both participants hold live feeds before anyone swipes.
    let mut her_feed = stack.sessions.bus().subscribe_for(her);
    let mut him_feed = stack.sessions.bus().subscribe_for(him);

    // She likes first (pays nothing); his like completes (he pays).
    let first = stack.engine.record_swipe(her, him, true).await.unwrap();
    assert!(!first.is_match);
    let second = stack.engine.record_swipe(him, her, true).await.unwrap();
    assert!(second.is_match);
    assert_eq!(second.passes_left, Some(2));

    let her_key = stack.identity_of(her).await;
    assert_eq!(stack.entitlement.get(&her_key).await.unwrap().passes_left, 3);

    // The non-initiating participant is pulled in with no action.
    for feed in [&mut her_feed, &mut him_feed] {
        let event = timeout(Duration::from_millis(100), feed.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(event.transition, SessionTransition::Created);
    }

    // Authoritative remaining time is server-computed.
    let pair = PairId::new(her, him);
    match stack.sessions.session_status(pair).await {
        SessionStatus::Active { remaining } => assert!(remaining <= Duration::from_secs(600)),
        other => panic!("expected active session, got {other:?}"),
    }

    // The fresh match hides the pair from both sides' discovery.
    assert!(stack.discovery.discover(her, 20).await.unwrap().is_empty());
    assert!(stack.discovery.discover(him, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_mutual_likes_create_exactly_one_match() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;

    let e1 = Arc::clone(&stack.engine);
    let e2 = Arc::clone(&stack.engine);
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { e1.record_swipe(her, him, true).await }),
        tokio::spawn(async move { e2.record_swipe(him, her, true).await }),
    );
    let outcomes = [r1.unwrap().unwrap(), r2.unwrap().unwrap()];

    let match_count = outcomes.iter().filter(|o| o.is_match).count();
    assert_eq!(match_count, 1, "exactly one swipe completes the pair");

    assert_eq!(stack.matches.len().await, 1);
    let record = stack.matches.get(PairId::new(her, him)).await.unwrap();
    assert_eq!(record.status, MatchStatus::Pending);

    // Exactly one of the two identities paid.
    let her_passes = {
        let key = stack.identity_of(her).await;
        stack.entitlement.get(&key).await.unwrap().passes_left
    };
    let him_passes = {
        let key = stack.identity_of(him).await;
        stack.entitlement.get(&key).await.unwrap().passes_left
    };
    assert_eq!(her_passes + him_passes, 5, "one pass total was consumed");
}

#[tokio::test]
async fn decline_applies_cooldown_and_locks_exhausted_decliner() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;
    let pair = PairId::new(her, him);

    stack.engine.record_swipe(her, him, true).await.unwrap();
    stack.engine.record_swipe(him, her, true).await.unwrap();

    // She declines while holding zero passes: the session closes, the
    // record flips to declined, and her identity locks on the spot.
    stack.set_passes(her, 0).await;
    stack.engine.decline_session(pair, her).await.unwrap();

    let record = stack.matches.get(pair).await.unwrap();
    assert_eq!(record.status, MatchStatus::Declined);
    assert_eq!(record.declined_by, Some(her));

    let her_key = stack.identity_of(her).await;
    let status = stack.entitlement.is_locked(&her_key).await.unwrap();
    assert!(status.locked, "decline at zero passes engages the lock");
    assert!(status.remaining > Duration::from_secs(7000));

    // The declined pair must not resurface within the cooldown window.
    assert!(stack.discovery.discover(her, 20).await.unwrap().is_empty());
    assert!(stack.discovery.discover(him, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn cooldown_expiry_resurfaces_the_pair() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;
    let pair = PairId::new(her, him);

    // A declined match 13 hours ago, likes already on record.
    let mut record = nearmatch_types::MatchRecord::new_pending(pair);
    record.created_at = Utc::now() - chrono::Duration::hours(13);
    record.status = MatchStatus::Declined;
    record.declined_by = Some(her);
    stack.matches.restore(record).await;

    // Swipe history still hides the pair (likes are permanent), so
    // resurfacing applies to pairs whose swipes did not both land —
    // here neither ever swiped.
    let hits = stack.discovery.discover(her, 20).await.unwrap();
    assert_eq!(hits.len(), 1, "13h-old outcome no longer blocks discovery");
    assert_eq!(hits[0].account, him);
}

#[tokio::test]
async fn meeting_confirmation_is_gender_gated_end_to_end() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;
    let pair = PairId::new(her, him);

    stack.engine.record_swipe(her, him, true).await.unwrap();
    stack.engine.record_swipe(him, her, true).await.unwrap();

    // His confirmation control is disabled at the write path.
    let err = stack.engine.confirm_meeting(pair, him).await.unwrap_err();
    assert!(matches!(err, NearmatchError::MeetingConfirmDenied));

    let mut him_feed = stack.sessions.bus().subscribe_for(him);
    let session = stack.engine.confirm_meeting(pair, her).await.unwrap();
    assert_eq!(session.meeting_confirmed_by, Some(her));

    let record = stack.matches.get(pair).await.unwrap();
    assert_eq!(record.status, MatchStatus::Successful);

    let event = timeout(Duration::from_millis(100), him_feed.recv())
        .await
        .expect("timeout")
        .expect("event");
    assert_eq!(event.transition, SessionTransition::MeetingConfirmed { by: her });

    // Acknowledgement tears the session down; the record stays.
    let reason = stack.engine.acknowledge_close(pair).await.unwrap();
    assert_eq!(reason, Some(CloseReason::MeetingConfirmed));
    assert!(stack.sessions.get(pair).await.is_none());
    assert!(stack.matches.get(pair).await.is_some());
}

#[tokio::test]
async fn racing_expiry_from_both_clients_is_idempotent() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;
    let pair = PairId::new(her, him);

    stack.engine.record_swipe(her, him, true).await.unwrap();
    stack.engine.record_swipe(him, her, true).await.unwrap();

    // Rewind the deadline so both clients see an overdue session.
    let mut session = stack.sessions.get(pair).await.unwrap();
    session.expires_at = Utc::now() - chrono::Duration::minutes(1);
    stack.sessions.insert_for_tests(session).await;

    let e1 = Arc::clone(&stack.engine);
    let e2 = Arc::clone(&stack.engine);
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { e1.expire_session(pair).await }),
        tokio::spawn(async move { e2.expire_session(pair).await }),
    );
    let closed = [r1.unwrap().unwrap(), r2.unwrap().unwrap()];
    assert_eq!(closed.iter().filter(|&&c| c).count(), 1, "one close, no errors");

    let session = stack.sessions.get(pair).await.unwrap();
    assert!(!session.is_active);
    assert_eq!(session.close_reason, Some(CloseReason::Expired));
}

#[tokio::test]
async fn partner_deletion_tears_down_as_partner_gone() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;
    let pair = PairId::new(her, him);

    stack.engine.record_swipe(her, him, true).await.unwrap();
    stack.engine.record_swipe(him, her, true).await.unwrap();

    let mut her_feed = stack.sessions.bus().subscribe_for(her);
    stack.engine.handle_account_deletion(him).await.unwrap();

    // The feed was opened after the match, so the first event it sees
    // is the tagged teardown.
    let event = timeout(Duration::from_millis(100), her_feed.recv())
        .await
        .expect("timeout")
        .expect("event");
    assert_eq!(event.transition, SessionTransition::PartnerGone { gone: him });

    let session = stack.sessions.get(pair).await.unwrap();
    assert_eq!(session.close_reason, Some(CloseReason::PartnerGone));

    // The match record survives the deletion.
    assert!(stack.matches.get(pair).await.is_some());
    assert!(stack.store.get(him).await.unwrap().is_deleted);
}

#[tokio::test]
async fn credential_cycling_cannot_reset_entitlement() {
    let stack = Stack::new();
    let her = stack.onboard(Gender::Female, 28, 32.0800, 34.7800).await;
    let him = stack.onboard(Gender::Male, 30, 32.0805, 34.7805).await;

    // He burns his last pass completing a match, which engages the lock.
    stack.set_passes(him, 1).await;
    stack.engine.record_swipe(her, him, true).await.unwrap();
    let outcome = stack.engine.record_swipe(him, her, true).await.unwrap();
    assert_eq!(outcome.passes_left, Some(0));

    let key = stack.identity_of(him).await;
    assert!(stack.entitlement.is_locked(&key).await.unwrap().locked);

    // He deletes the account and signs up fresh — same phone, new
    // credential. The identity record rebinds; the lock rides along.
    stack.engine.handle_account_deletion(him).await.unwrap();
    let fresh = AccountId::new();
    stack.resolver.bind(fresh, key.clone());
    let identity = stack.entitlement.register(key.clone(), fresh).await.unwrap();

    assert_eq!(identity.current_account, Some(fresh));
    assert_eq!(identity.previous_accounts, vec![him]);
    assert_eq!(identity.passes_left, 0);
    assert!(
        stack.entitlement.is_locked(&key).await.unwrap().locked,
        "the cooldown lock survives credential cycling"
    );
}
