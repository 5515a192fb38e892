//! The profile store: source of truth for profiles plus the geohash
//! index behind proximity scans.
//!
//! Swipe history is append-only by construction — the store exposes
//! `record_like` / `record_pass` and no removal path, which is what keeps
//! the "already swiped" discovery filter sound.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use tokio::sync::RwLock;
use tracing::debug;

use nearmatch_types::{AccountId, GeoLocation, GeoPoint, NearmatchError, PairId, Result, UserProfile};

/// Concurrent in-memory profile store with a geohash prefix index.
///
/// Lock order is always `profiles` before `by_cell`; both are held only
/// across synchronous sections.
pub struct ProfileStore {
    profiles: RwLock<HashMap<AccountId, UserProfile>>,
    /// Full-precision geohash → accounts currently in that cell. A
    /// `BTreeMap` so that shorter prefixes (expanded search) resolve via
    /// an ordered range scan.
    by_cell: RwLock<BTreeMap<String, HashSet<AccountId>>>,
    /// Always-available seed/test profiles, sourced into every scan.
    seeds: RwLock<HashSet<AccountId>>,
    precision: usize,
}

impl ProfileStore {
    #[must_use]
    pub fn new(precision: usize) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            by_cell: RwLock::new(BTreeMap::new()),
            seeds: RwLock::new(HashSet::new()),
            precision,
        }
    }

    /// Geohash precision of the index.
    #[must_use]
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Insert or replace a profile. The stored geohash is always
    /// recomputed from the profile's point, so callers never need to
    /// pre-encode.
    pub async fn upsert(&self, mut profile: UserProfile) -> Result<()> {
        if let Some(location) = profile.location.as_mut() {
            location.geohash =
                nearmatch_geo::encode(location.point.lat(), location.point.lon(), self.precision)?;
        }

        let mut profiles = self.profiles.write().await;
        let mut by_cell = self.by_cell.write().await;

        let old_cell = profiles
            .get(&profile.account_id)
            .and_then(|p| p.location.as_ref().map(|l| l.geohash.clone()));
        if let Some(cell) = old_cell {
            Self::remove_from_cell(&mut by_cell, &cell, profile.account_id);
        }
        if let Some(location) = &profile.location {
            by_cell
                .entry(location.geohash.clone())
                .or_default()
                .insert(profile.account_id);
        }
        profiles.insert(profile.account_id, profile);
        Ok(())
    }

    /// Snapshot of a profile, including soft-deleted ones. Callers that
    /// must not see deleted profiles filter on `is_deleted`.
    pub async fn get(&self, account: AccountId) -> Option<UserProfile> {
        self.profiles.read().await.get(&account).cloned()
    }

    /// Update a profile's position and re-index it.
    pub async fn set_location(&self, account: AccountId, point: GeoPoint) -> Result<GeoLocation> {
        let geohash = nearmatch_geo::encode(point.lat(), point.lon(), self.precision)?;
        let location = GeoLocation {
            point,
            geohash: geohash.clone(),
        };

        let mut profiles = self.profiles.write().await;
        let mut by_cell = self.by_cell.write().await;
        let profile = profiles
            .get_mut(&account)
            .ok_or(NearmatchError::ProfileNotFound(account))?;

        if let Some(old) = &profile.location {
            Self::remove_from_cell(&mut by_cell, &old.geohash, account);
        }
        by_cell.entry(geohash).or_default().insert(account);
        profile.location = Some(location.clone());
        Ok(location)
    }

    /// Append a like. Append-only: there is no inverse operation.
    pub async fn record_like(&self, account: AccountId, target: AccountId) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&account)
            .ok_or(NearmatchError::ProfileNotFound(account))?;
        profile.liked_ids.insert(target);
        Ok(())
    }

    /// Append a pass. Append-only: there is no inverse operation.
    pub async fn record_pass(&self, account: AccountId, target: AccountId) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&account)
            .ok_or(NearmatchError::ProfileNotFound(account))?;
        profile.passed_ids.insert(target);
        Ok(())
    }

    /// Record a formed match on both members' profiles.
    pub async fn add_match(&self, pair: PairId) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        for account in [pair.lo(), pair.hi()] {
            let profile = profiles
                .get_mut(&account)
                .ok_or(NearmatchError::ProfileNotFound(account))?;
            profile.matches.insert(pair);
        }
        Ok(())
    }

    /// Soft delete: clears position and visibility, removes the profile
    /// from the geo index, keeps the record (match history still
    /// references it).
    pub async fn soft_delete(&self, account: AccountId) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let mut by_cell = self.by_cell.write().await;
        let profile = profiles
            .get_mut(&account)
            .ok_or(NearmatchError::ProfileNotFound(account))?;

        if let Some(location) = &profile.location {
            Self::remove_from_cell(&mut by_cell, &location.geohash, account);
        }
        profile.soft_delete();
        debug!(%account, "profile soft-deleted");
        Ok(())
    }

    /// Insert a profile into the always-available seed pool.
    pub async fn insert_seed(&self, profile: UserProfile) -> Result<()> {
        let account = profile.account_id;
        self.upsert(profile).await?;
        self.seeds.write().await.insert(account);
        Ok(())
    }

    /// Current seed pool members.
    pub async fn seed_ids(&self) -> Vec<AccountId> {
        self.seeds.read().await.iter().copied().collect()
    }

    /// Accounts whose stored geohash starts with any of the given cell
    /// prefixes. Cells at index precision hit exactly; shorter prefixes
    /// (expanded search) sweep every indexed cell underneath them.
    pub async fn in_cells(&self, cells: &[String]) -> Vec<AccountId> {
        let by_cell = self.by_cell.read().await;
        let mut out: Vec<AccountId> = Vec::new();
        let mut seen: HashSet<AccountId> = HashSet::new();
        for prefix in cells {
            for (_, members) in by_cell
                .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                .take_while(|(cell, _)| cell.starts_with(prefix.as_str()))
            {
                for &account in members {
                    if seen.insert(account) {
                        out.push(account);
                    }
                }
            }
        }
        out
    }

    fn remove_from_cell(
        by_cell: &mut BTreeMap<String, HashSet<AccountId>>,
        cell: &str,
        account: AccountId,
    ) {
        if let Some(members) = by_cell.get_mut(cell) {
            members.remove(&account);
            if members.is_empty() {
                by_cell.remove(cell);
            }
        }
    }
}
