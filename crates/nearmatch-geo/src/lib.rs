//! # nearmatch-geo
//!
//! **Pure geospatial plane**: geohash encoding, cell neighborhoods, and
//! great-circle distance. This is the only crate the discovery engine
//! trusts for proximity math.
//!
//! Every function here is pure — no side effects, no I/O, no clock. The
//! only failure modes are invalid coordinate ranges and malformed geohash
//! input.

pub mod distance;
pub mod geohash;

pub use distance::{EARTH_RADIUS_METERS, distance_meters, haversine};
pub use geohash::{BoundingBox, decode_bbox, encode, neighbors};
