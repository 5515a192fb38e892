//! System-wide constants for the NearMatch engine.

/// Default active-session length in seconds (the decide-now window).
pub const DEFAULT_SESSION_SECS: u64 = 600;

/// Default re-surfacing cooldown after any match outcome, in hours.
pub const DEFAULT_REMATCH_COOLDOWN_HOURS: u64 = 12;

/// Default entitlement lock duration after pass exhaustion, in seconds.
pub const DEFAULT_LOCK_DURATION_SECS: u64 = 7_200;

/// Daily pass allotment for free identities.
pub const FREE_DAILY_PASSES: u32 = 3;

/// Daily pass allotment for premium identities.
pub const PREMIUM_DAILY_PASSES: u32 = 10;

/// Geohash precision used for the proximity index (cell ≈ 1.2 km × 0.6 km).
pub const DEFAULT_GEOHASH_PRECISION: usize = 6;

/// Maximum geohash precision the encoder accepts.
pub const MAX_GEOHASH_PRECISION: usize = 12;

/// Default cap on discovery results per query.
pub const DEFAULT_RESULT_CAP: usize = 20;

/// Minimum age the system serves.
pub const MIN_AGE: u8 = 18;

/// Bounded retries for contended per-pair or per-identity operations.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Linear backoff step between conflict retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Timeout for a single pair-lock acquisition attempt, in milliseconds.
pub const PAIR_LOCK_TIMEOUT_MS: u64 = 1_000;

/// Session event bus channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_024;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "NearMatch";
