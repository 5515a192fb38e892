//! # nearmatch-discovery
//!
//! **Discovery plane**: the geohash-indexed profile store, the external
//! collaborator seams (location, venue presence), and the proximity
//! candidate query.
//!
//! ## Query Flow
//!
//! ```text
//! PresenceOracle.is_present() → LocationProvider.current_fix()
//!     → geohash 9-cell neighborhood → ProfileStore prefix scan (+ seeds)
//!     → identity / preference / cooldown filters → sort by distance → cap
//! ```
//!
//! The candidate scan is coarse (grid cells), the filters are exact
//! (haversine post-filter). A failed location fetch surfaces a typed
//! error and no results — never a stale list.

pub mod engine;
pub mod location;
pub mod store;

pub use engine::{DiscoveryEngine, DiscoveryHit, RecentMatchIndex};
pub use location::{AlwaysPresent, LocationProvider, PresenceOracle, StaticLocationProvider};
pub use store::ProfileStore;
