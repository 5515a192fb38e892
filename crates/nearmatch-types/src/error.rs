//! Error types for the NearMatch engine.
//!
//! All errors use the `NM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation errors
//! - 2xx: Entitlement errors
//! - 3xx: Swipe / match errors
//! - 4xx: Session errors
//! - 5xx: Discovery / external collaborator errors
//! - 6xx: Concurrency errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AccountId, IdentityKey, PairId};

/// Central error enum for all NearMatch operations.
#[derive(Debug, Error)]
pub enum NearmatchError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// A coordinate fell outside ±90° latitude / ±180° longitude.
    #[error("NM_ERR_100: Invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// Search preferences failed validation (inverted ranges, underage bounds).
    #[error("NM_ERR_101: Invalid preferences: {reason}")]
    InvalidPreferences { reason: String },

    /// Geohash precision outside the supported range.
    #[error("NM_ERR_102: Invalid geohash precision: {0}")]
    InvalidPrecision(usize),

    /// A geohash string contained characters outside the base32 alphabet.
    #[error("NM_ERR_103: Invalid geohash: {0}")]
    InvalidGeohash(String),

    // =================================================================
    // Entitlement Errors (2xx)
    // =================================================================
    /// No passes left. Surfaced to the caller to trigger the paywall flow;
    /// never silently downgraded to a decline.
    #[error("NM_ERR_200: Insufficient entitlement: no passes left")]
    InsufficientEntitlement,

    /// The identity is inside its cooldown lock.
    #[error("NM_ERR_201: Entitlement locked for {remaining_secs}s")]
    EntitlementLocked { remaining_secs: i64 },

    /// No ledger record for this identity key.
    #[error("NM_ERR_202: Identity not found: {0}")]
    IdentityNotFound(IdentityKey),

    // =================================================================
    // Swipe / Match Errors (3xx)
    // =================================================================
    /// A user tried to swipe on themselves.
    #[error("NM_ERR_300: Self-swipe blocked")]
    SelfSwipeBlocked,

    /// The seeker already swiped on this target (swipe sets are append-only).
    #[error("NM_ERR_301: Already swiped on {target}")]
    AlreadySwiped { target: AccountId },

    /// A match record already exists for this pair.
    #[error("NM_ERR_302: Match already exists: {0}")]
    MatchAlreadyExists(PairId),

    /// No match record for this pair.
    #[error("NM_ERR_303: Match not found: {0}")]
    MatchNotFound(PairId),

    // =================================================================
    // Session Errors (4xx)
    // =================================================================
    /// No session for this pair (vanished mid-operation or never created).
    #[error("NM_ERR_400: Session not found: {0}")]
    SessionNotFound(PairId),

    /// The acting account is not a member of the session's pair.
    #[error("NM_ERR_401: {account} is not a participant of {pair}")]
    NotAParticipant { account: AccountId, pair: PairId },

    /// Only the designated side may confirm a meeting. This is a capability
    /// check on the write path, not a UI affordance.
    #[error("NM_ERR_402: Meeting confirmation denied for this participant")]
    MeetingConfirmDenied,

    /// The session has already reached a terminal state.
    #[error("NM_ERR_403: Session already closed: {0}")]
    SessionClosed(PairId),

    // =================================================================
    // Discovery / External Errors (5xx)
    // =================================================================
    /// The location fetch failed. Discovery returns no results rather than
    /// serving stale distances.
    #[error("NM_ERR_500: Location unavailable: {reason}")]
    LocationUnavailable { reason: String },

    /// No profile for this account id (or the profile is soft-deleted).
    #[error("NM_ERR_501: Profile not found: {0}")]
    ProfileNotFound(AccountId),

    /// An external collaborator (presence oracle, payment) failed.
    #[error("NM_ERR_502: External collaborator unavailable: {service}: {reason}")]
    ExternalUnavailable { service: String, reason: String },

    // =================================================================
    // Concurrency Errors (6xx)
    // =================================================================
    /// A contended per-pair or per-identity operation exhausted its bounded
    /// retries. Transient: the caller may retry, the write was not applied.
    #[error("NM_ERR_600: Concurrency conflict: {reason}")]
    ConcurrencyConflict { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("NM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("NM_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, NearmatchError>;

impl From<serde_json::Error> for NearmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
