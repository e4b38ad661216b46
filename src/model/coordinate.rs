//! Geographic coordinate in degrees.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A WGS84 latitude/longitude pair.
///
/// Constructed through [`Coordinate::new`], which enforces
/// `-90 ≤ lat ≤ 90` and `-180 ≤ lng ≤ 180`. Every other operation in the
/// crate assumes a valid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(Error::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    /// Shift by a delta in degrees.
    ///
    /// Latitude saturates at the poles; longitude wraps across the
    /// antimeridian, so the result is always a valid coordinate.
    pub fn offset(self, delta_lat: f64, delta_lng: f64) -> Self {
        let latitude = (self.latitude + delta_lat).clamp(-90.0, 90.0);
        let mut longitude = self.longitude + delta_lng;
        if !(-180.0..=180.0).contains(&longitude) {
            longitude = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        }
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
