//! User profile model: gender, preferences, location, and the append-only
//! swipe history.
//!
//! The `liked_ids` / `passed_ids` sets only ever grow. No component exposes
//! a removal path, which is what makes the "already swiped" discovery
//! filter sound without re-deriving history elsewhere.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{AccountId, GeoLocation, IdentityKey, NearmatchError, PairId, Result, constants};

/// Profile gender. Gender decides orientation: discovery only ever shows
/// the opposite gender, there is no separate orientation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// The gender this profile is shown in discovery.
    #[must_use]
    pub fn target(self) -> Self {
        match self {
            Self::Female => Self::Male,
            Self::Male => Self::Female,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Female => write!(f, "F"),
            Self::Male => write!(f, "M"),
        }
    }
}

/// Inclusive age band a seeker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    /// # Errors
    /// Rejects inverted bands and bounds below the minimum served age.
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min > max {
            return Err(NearmatchError::InvalidPreferences {
                reason: format!("age range inverted: [{min}, {max}]"),
            });
        }
        if min < constants::MIN_AGE {
            return Err(NearmatchError::InvalidPreferences {
                reason: format!("age range minimum {min} below {}", constants::MIN_AGE),
            });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn contains(&self, age: u8) -> bool {
        age >= self.min && age <= self.max
    }
}

/// A seeker's discovery preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPreferences {
    /// Lower distance bound in meters.
    pub min_distance_m: f64,
    /// Upper distance bound in meters.
    pub max_distance_m: f64,
    /// Accepted age band, applied symmetrically with the candidate's own.
    pub age_range: AgeRange,
    /// Widen the scan to a one-level-coarser geohash neighborhood.
    pub expand_search: bool,
}

impl SearchPreferences {
    /// # Errors
    /// Rejects negative or inverted distance bands.
    pub fn validate(&self) -> Result<()> {
        if self.min_distance_m < 0.0
            || !self.min_distance_m.is_finite()
            || !self.max_distance_m.is_finite()
            || self.min_distance_m > self.max_distance_m
        {
            return Err(NearmatchError::InvalidPreferences {
                reason: format!(
                    "distance band inverted or negative: [{}, {}]",
                    self.min_distance_m, self.max_distance_m
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn accepts_distance(&self, meters: f64) -> bool {
        meters >= self.min_distance_m && meters <= self.max_distance_m
    }
}

impl Default for SearchPreferences {
    fn default() -> Self {
        Self {
            min_distance_m: 0.0,
            max_distance_m: 5_000.0,
            age_range: AgeRange {
                min: constants::MIN_AGE,
                max: 99,
            },
            expand_search: false,
        }
    }
}

/// A user profile. Created at onboarding completion; soft-deleted on
/// account deletion (location and availability cleared, flag set), never
/// hard-removed while match records still reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub account_id: AccountId,
    /// The true identity this account is currently bound to.
    pub identity: IdentityKey,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    /// Current position; `None` until the first location fix lands.
    pub location: Option<GeoLocation>,
    pub preferences: SearchPreferences,
    /// The owner's own visibility switch.
    pub is_available: bool,
    pub is_deleted: bool,
    /// Accounts this profile liked. Append-only.
    pub liked_ids: HashSet<AccountId>,
    /// Accounts this profile passed on. Append-only.
    pub passed_ids: HashSet<AccountId>,
    /// Pairs this profile has matched with.
    pub matches: HashSet<PairId>,
}

impl UserProfile {
    #[must_use]
    pub fn new(
        account_id: AccountId,
        identity: IdentityKey,
        gender: Gender,
        birth_date: NaiveDate,
    ) -> Self {
        Self {
            account_id,
            identity,
            gender,
            birth_date,
            location: None,
            preferences: SearchPreferences::default(),
            is_available: true,
            is_deleted: false,
            liked_ids: HashSet::new(),
            passed_ids: HashSet::new(),
            matches: HashSet::new(),
        }
    }

    /// Age in whole years on the given date.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn age_on(&self, on: NaiveDate) -> u8 {
        on.years_since(self.birth_date).unwrap_or(0).min(255) as u8
    }

    /// Whether this profile already expressed a like or pass on `other`.
    #[must_use]
    pub fn has_swiped(&self, other: AccountId) -> bool {
        self.liked_ids.contains(&other) || self.passed_ids.contains(&other)
    }

    /// Soft delete: clear position and visibility, set the flag. Swipe
    /// history and the matches set stay — permanent match records still
    /// reference this pair and the append-only guarantee must survive.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.is_available = false;
        self.location = None;
    }
}

/// Dummy profile for testing.
#[cfg(any(test, feature = "test-helpers"))]
impl UserProfile {
    /// Create a dummy profile with the given gender, age, and position.
    /// The geohash is left empty; the profile store fills it on upsert.
    #[must_use]
    pub fn dummy(gender: Gender, age_years: u32, lat: f64, lon: f64) -> Self {
        use crate::GeoPoint;

        let account_id = AccountId::new();
        let identity = IdentityKey::new(format!("1555{:07}", rand::random::<u32>() % 10_000_000));
        let birth_date = chrono::Utc::now().date_naive() - chrono::Months::new(age_years * 12 + 6);
        let mut profile = Self::new(account_id, identity, gender, birth_date);
        profile.location = Some(GeoLocation {
            point: GeoPoint::new(lat, lon).expect("dummy coordinates must be valid"),
            geohash: String::new(),
        });
        profile
    }
}
