//! Geographic primitives: validated coordinates and location fixes.

use serde::{Deserialize, Serialize};

use crate::{NearmatchError, Result};

/// A validated WGS84 coordinate pair.
///
/// Construction rejects latitudes outside ±90° and longitudes outside
/// ±180°, so every `GeoPoint` in the system is known-good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a validated point.
    ///
    /// # Errors
    /// Returns [`NearmatchError::InvalidCoordinates`] for out-of-range or
    /// non-finite values.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(NearmatchError::InvalidCoordinates { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// A location sample from the location collaborator.
///
/// `accuracy_m` is untrusted metadata: the engine carries it through for
/// venue check-in grace margins but never uses it in distance filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub accuracy_m: f64,
}

/// A profile's stored position: the validated point plus its proximity
/// index key. The geohash is maintained by the profile store whenever the
/// point changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub point: GeoPoint,
    pub geohash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_point_accepted() {
        let p = GeoPoint::new(32.08, 34.78).unwrap();
        assert!((p.lat() - 32.08).abs() < f64::EPSILON);
        assert!((p.lon() - 34.78).abs() < f64::EPSILON);
    }

    #[test]
    fn boundary_points_accepted() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn out_of_range_latitude_rejected() {
        let err = GeoPoint::new(90.001, 0.0).unwrap_err();
        assert!(matches!(err, NearmatchError::InvalidCoordinates { .. }));
    }

    #[test]
    fn out_of_range_longitude_rejected() {
        assert!(GeoPoint::new(0.0, 180.001).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
    }

    #[test]
    fn non_finite_rejected() {
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let fix = LocationFix {
            point: GeoPoint::new(32.08, 34.78).unwrap(),
            accuracy_m: 12.5,
        };
        let json = serde_json::to_string(&fix).unwrap();
        let back: LocationFix = serde_json::from_str(&json).unwrap();
        assert_eq!(fix, back);
    }
}
