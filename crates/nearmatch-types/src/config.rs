//! Configuration types for the NearMatch engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Gender, constants};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub entitlement: EntitlementConfig,
    pub concurrency: ConcurrencyConfig,
}

/// Discovery query tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Geohash precision of the proximity index.
    pub geohash_precision: usize,
    /// Default cap on results per query.
    pub result_cap: usize,
    /// Window after any match outcome during which the pair will not
    /// resurface to each other.
    pub rematch_cooldown: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            geohash_precision: constants::DEFAULT_GEOHASH_PRECISION,
            result_cap: constants::DEFAULT_RESULT_CAP,
            rematch_cooldown: Duration::from_secs(
                constants::DEFAULT_REMATCH_COOLDOWN_HOURS * 3600,
            ),
        }
    }
}

/// Session lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Length of the decide-now window.
    pub session_length: Duration,
    /// The gender allowed to confirm a meeting. Product rule: the other
    /// participant's confirmation control is permanently disabled.
    pub designated_gender: Gender,
    /// Event bus channel capacity.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Capability check for the meeting-confirmation write path.
    #[must_use]
    pub fn can_confirm_meeting(&self, gender: Gender) -> bool {
        gender == self.designated_gender
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_length: Duration::from_secs(constants::DEFAULT_SESSION_SECS),
            designated_gender: Gender::Female,
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Entitlement ledger tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementConfig {
    pub free_daily_passes: u32,
    pub premium_daily_passes: u32,
    /// Cooldown lock applied when a consume reaches zero passes.
    pub lock_duration: Duration,
}

impl EntitlementConfig {
    /// The daily allotment for the given tier.
    #[must_use]
    pub fn allotment(&self, is_premium: bool) -> u32 {
        if is_premium {
            self.premium_daily_passes
        } else {
            self.free_daily_passes
        }
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            free_daily_passes: constants::FREE_DAILY_PASSES,
            premium_daily_passes: constants::PREMIUM_DAILY_PASSES,
            lock_duration: Duration::from_secs(constants::DEFAULT_LOCK_DURATION_SECS),
        }
    }
}

/// Retry policy for contended per-pair and per-identity operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Bounded retries before surfacing a transient conflict.
    pub conflict_retries: u32,
    /// Linear backoff step between retries.
    pub retry_backoff: Duration,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            conflict_retries: constants::DEFAULT_CONFLICT_RETRIES,
            retry_backoff: Duration::from_millis(constants::DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_defaults() {
        let cfg = DiscoveryConfig::default();
        assert_eq!(cfg.geohash_precision, 6);
        assert_eq!(cfg.result_cap, 20);
        assert_eq!(cfg.rematch_cooldown, Duration::from_secs(12 * 3600));
    }

    #[test]
    fn session_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.session_length, Duration::from_secs(600));
        assert_eq!(cfg.designated_gender, Gender::Female);
    }

    #[test]
    fn confirm_capability_follows_designated_gender() {
        let cfg = SessionConfig::default();
        assert!(cfg.can_confirm_meeting(Gender::Female));
        assert!(!cfg.can_confirm_meeting(Gender::Male));

        let flipped = SessionConfig {
            designated_gender: Gender::Male,
            ..SessionConfig::default()
        };
        assert!(flipped.can_confirm_meeting(Gender::Male));
        assert!(!flipped.can_confirm_meeting(Gender::Female));
    }

    #[test]
    fn entitlement_allotment_by_tier() {
        let cfg = EntitlementConfig::default();
        assert_eq!(cfg.allotment(false), 3);
        assert_eq!(cfg.allotment(true), 10);
        assert_eq!(cfg.lock_duration, Duration::from_secs(7200));
    }

    #[test]
    fn engine_config_serde_roundtrip() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.discovery.result_cap, cfg.discovery.result_cap);
        assert_eq!(back.session.session_length, cfg.session.session_length);
        assert_eq!(
            back.entitlement.free_daily_passes,
            cfg.entitlement.free_daily_passes
        );
    }
}
