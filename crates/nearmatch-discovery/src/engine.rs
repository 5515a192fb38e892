//! The proximity candidate query: coarse grid scan, exact filters,
//! distance-ordered results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use nearmatch_types::{AccountId, DiscoveryConfig, PairId, Result, UserProfile};

use crate::location::{LocationProvider, PresenceOracle};
use crate::store::ProfileStore;

/// Lookup for the most recent match between a pair, whatever its
/// outcome. Implemented by the match ledger; drives the re-surfacing
/// cooldown filter.
#[async_trait]
pub trait RecentMatchIndex: Send + Sync {
    async fn latest_match_at(&self, pair: &PairId) -> Option<DateTime<Utc>>;
}

/// One discovery result: a candidate and the exact distance to the
/// seeker's current fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoveryHit {
    pub account: AccountId,
    pub distance_m: f64,
}

/// The discovery engine. Holds the store and collaborator seams; every
/// query is an independent unit of work.
pub struct DiscoveryEngine {
    store: Arc<ProfileStore>,
    matches: Arc<dyn RecentMatchIndex>,
    location: Arc<dyn LocationProvider>,
    presence: Arc<dyn PresenceOracle>,
    config: DiscoveryConfig,
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new(
        store: Arc<ProfileStore>,
        matches: Arc<dyn RecentMatchIndex>,
        location: Arc<dyn LocationProvider>,
        presence: Arc<dyn PresenceOracle>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            store,
            matches,
            location,
            presence,
            config,
        }
    }

    /// Run one discovery query for `seeker`, returning at most `cap`
    /// candidates ordered by ascending distance.
    ///
    /// A fresh location fix is fetched per query and also written back to
    /// the store, so the seeker's own index cell tracks reality. Not
    /// being checked in at a venue yields an empty result by product
    /// rule; a failed location fetch is a typed error, never a stale
    /// list.
    pub async fn discover(&self, seeker: AccountId, cap: usize) -> Result<Vec<DiscoveryHit>> {
        let seeker_profile = self
            .store
            .get(seeker)
            .await
            .filter(|p| !p.is_deleted)
            .ok_or(nearmatch_types::NearmatchError::ProfileNotFound(seeker))?;
        seeker_profile.preferences.validate()?;

        if !self.presence.is_present(seeker).await? {
            debug!(%seeker, "not checked in at a venue, empty result");
            return Ok(Vec::new());
        }

        let fix = self.location.current_fix(seeker).await?;
        self.store.set_location(seeker, fix.point).await?;

        // One precision level coarser widens the scan roughly 8x.
        let precision = if seeker_profile.preferences.expand_search {
            self.config.geohash_precision.saturating_sub(1).max(1)
        } else {
            self.config.geohash_precision
        };
        let center = nearmatch_geo::encode(fix.point.lat(), fix.point.lon(), precision)?;
        let cells = nearmatch_geo::neighbors(&center)?;

        let mut pool = self.store.in_cells(&cells).await;
        for seed in self.store.seed_ids().await {
            if !pool.contains(&seed) {
                pool.push(seed);
            }
        }

        let today = Utc::now().date_naive();
        let seeker_age = seeker_profile.age_on(today);
        let scanned = pool.len();

        let mut hits: Vec<DiscoveryHit> = Vec::new();
        for candidate_id in pool {
            if candidate_id == seeker {
                continue;
            }
            let Some(candidate) = self.store.get(candidate_id).await else {
                continue;
            };
            if let Some(distance_m) = self
                .admit(&seeker_profile, seeker_age, &candidate, today, fix.point)
                .await
            {
                hits.push(DiscoveryHit {
                    account: candidate_id,
                    distance_m,
                });
            }
        }

        hits.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        hits.truncate(cap);
        debug!(%seeker, scanned, returned = hits.len(), "discovery query complete");
        Ok(hits)
    }

    /// Apply the full filter chain to one candidate. Returns the exact
    /// distance for admitted candidates, `None` for rejected ones.
    async fn admit(
        &self,
        seeker: &UserProfile,
        seeker_age: u8,
        candidate: &UserProfile,
        today: chrono::NaiveDate,
        seeker_point: nearmatch_types::GeoPoint,
    ) -> Option<f64> {
        if candidate.is_deleted || !candidate.is_available {
            return None;
        }
        if candidate.gender != seeker.gender.target() {
            return None;
        }
        // Either direction already swiped: a one-sided pending like must
        // not resurface as a fresh card.
        if seeker.has_swiped(candidate.account_id) || candidate.has_swiped(seeker.account_id) {
            return None;
        }

        let pair = PairId::new(seeker.account_id, candidate.account_id);
        if let Some(matched_at) = self.matches.latest_match_at(&pair).await {
            if within_cooldown(matched_at, Utc::now(), self.config.rematch_cooldown) {
                return None;
            }
        }

        // Two-way symmetric age filter.
        let candidate_age = candidate.age_on(today);
        if !seeker.preferences.age_range.contains(candidate_age)
            || !candidate.preferences.age_range.contains(seeker_age)
        {
            return None;
        }

        let location = candidate.location.as_ref()?;
        let distance_m = nearmatch_geo::distance_meters(&seeker_point, &location.point);
        if !seeker.preferences.accepts_distance(distance_m) {
            return None;
        }

        Some(distance_m)
    }
}

fn within_cooldown(matched_at: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    match now.signed_duration_since(matched_at).to_std() {
        Ok(elapsed) => elapsed < cooldown,
        Err(_) => true,
    }
}
