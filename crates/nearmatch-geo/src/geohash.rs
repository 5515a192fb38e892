//! Geohash cells: base32 encoding, bounding boxes, and the 9-cell
//! neighborhood used by proximity queries.
//!
//! A geohash interleaves longitude and latitude bisection bits (longitude
//! first) and emits 5 bits per base32 character, so cells at a given
//! precision form a prefix-ordered grid: all points inside a cell share
//! the cell's string prefix. That property is what lets the profile store
//! answer "who is near this cell" with a plain string range scan.

use nearmatch_types::{NearmatchError, Result, constants};

/// The geohash base32 alphabet (no a, i, l, o).
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Decoded extent of a geohash cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Cell center.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Cell height in degrees of latitude.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Cell width in degrees of longitude.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat < self.max_lat && lon >= self.min_lon && lon < self.max_lon
    }
}

/// Encode a coordinate into a geohash of the given precision.
///
/// # Errors
/// Rejects coordinates outside ±90°/±180° and precisions outside
/// `1..=12`.
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<String> {
    if precision == 0 || precision > constants::MAX_GEOHASH_PRECISION {
        return Err(NearmatchError::InvalidPrecision(precision));
    }
    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(NearmatchError::InvalidCoordinates { lat, lon });
    }

    let mut lat_lo = -90.0_f64;
    let mut lat_hi = 90.0_f64;
    let mut lon_lo = -180.0_f64;
    let mut lon_hi = 180.0_f64;

    let mut hash = String::with_capacity(precision);
    let mut bits_in_char = 0u8;
    let mut current = 0usize;
    let mut even_bit = true; // longitude first

    while hash.len() < precision {
        if even_bit {
            let mid = (lon_lo + lon_hi) / 2.0;
            if lon >= mid {
                current = (current << 1) | 1;
                lon_lo = mid;
            } else {
                current <<= 1;
                lon_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if lat >= mid {
                current = (current << 1) | 1;
                lat_lo = mid;
            } else {
                current <<= 1;
                lat_hi = mid;
            }
        }
        even_bit = !even_bit;
        bits_in_char += 1;
        if bits_in_char == 5 {
            hash.push(char::from(BASE32[current]));
            bits_in_char = 0;
            current = 0;
        }
    }
    Ok(hash)
}

/// Decode a geohash into its cell's bounding box.
///
/// # Errors
/// Rejects empty input, over-long input, and characters outside the
/// base32 alphabet.
pub fn decode_bbox(geohash: &str) -> Result<BoundingBox> {
    if geohash.is_empty() || geohash.len() > constants::MAX_GEOHASH_PRECISION {
        return Err(NearmatchError::InvalidGeohash(geohash.to_string()));
    }

    let mut lat_lo = -90.0_f64;
    let mut lat_hi = 90.0_f64;
    let mut lon_lo = -180.0_f64;
    let mut lon_hi = 180.0_f64;
    let mut even_bit = true;

    for ch in geohash.bytes() {
        let Some(value) = BASE32.iter().position(|&b| b == ch.to_ascii_lowercase()) else {
            return Err(NearmatchError::InvalidGeohash(geohash.to_string()));
        };
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1;
            if even_bit {
                let mid = (lon_lo + lon_hi) / 2.0;
                if bit == 1 {
                    lon_lo = mid;
                } else {
                    lon_hi = mid;
                }
            } else {
                let mid = (lat_lo + lat_hi) / 2.0;
                if bit == 1 {
                    lat_lo = mid;
                } else {
                    lat_hi = mid;
                }
            }
            even_bit = !even_bit;
        }
    }

    Ok(BoundingBox {
        min_lat: lat_lo,
        max_lat: lat_hi,
        min_lon: lon_lo,
        max_lon: lon_hi,
    })
}

/// The 9-cell neighborhood of a geohash: the cell itself plus its 8
/// adjacent cells at the same precision.
///
/// Longitude wraps across the antimeridian; rows that would cross a pole
/// are dropped, so cells near ±90° return fewer than 9 neighbors. The
/// result is deduplicated and always contains the input cell.
///
/// # Errors
/// Propagates decode errors for malformed input.
pub fn neighbors(geohash: &str) -> Result<Vec<String>> {
    let bbox = decode_bbox(geohash)?;
    let (lat_c, lon_c) = bbox.center();
    let lat_step = bbox.lat_span();
    let lon_step = bbox.lon_span();

    let mut cells = Vec::with_capacity(9);
    for dlat in [0i8, -1, 1] {
        let lat = f64::from(dlat).mul_add(lat_step, lat_c);
        if !(-90.0..=90.0).contains(&lat) {
            continue;
        }
        for dlon in [0i8, -1, 1] {
            let lon = wrap_lon(f64::from(dlon).mul_add(lon_step, lon_c));
            let cell = encode(lat, lon, geohash.len())?;
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
    }
    Ok(cells)
}

/// Normalize a longitude into [-180, 180).
fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
