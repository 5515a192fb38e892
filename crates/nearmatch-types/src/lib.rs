//! # nearmatch-types
//!
//! Shared types, errors, and configuration for the **NearMatch**
//! proximity matching engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`IdentityKey`], [`PairId`]
//! - **Geo primitives**: [`GeoPoint`], [`LocationFix`], [`GeoLocation`]
//! - **Profile model**: [`UserProfile`], [`Gender`], [`SearchPreferences`], [`AgeRange`]
//! - **Identity model**: [`TrueIdentity`], [`LockStatus`]
//! - **Match model**: [`MatchRecord`], [`MatchStatus`]
//! - **Session model**: [`ActiveMatchSession`], [`CloseReason`], [`SessionEvent`], [`SessionTransition`]
//! - **Configuration**: [`EngineConfig`], [`DiscoveryConfig`], [`SessionConfig`], [`EntitlementConfig`]
//! - **Errors**: [`NearmatchError`] with `NM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod identity;
pub mod ids;
pub mod profile;
pub mod record;
pub mod session;

// Re-export all primary types at crate root for ergonomic imports:
//   use nearmatch_types::{UserProfile, PairId, MatchRecord, ...};

pub use config::*;
pub use error::*;
pub use geo::*;
pub use identity::*;
pub use ids::*;
pub use profile::*;
pub use record::*;
pub use session::*;

// Constants are accessed via `nearmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
