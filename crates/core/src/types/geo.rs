//! Geographic coordinates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for out-of-range coordinates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoError {
    #[error("latitude must be between -90 and 90 (got {0})")]
    Latitude(f64),
    #[error("longitude must be between -180 and 180 (got {0})")]
    Longitude(f64),
    #[error("south edge must not be above the north edge")]
    InvertedBounds,
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a validated point.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` if either coordinate is out of range or not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check the coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` for out-of-range or non-finite values.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoError::Latitude(self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(GeoError::Longitude(self.lng));
        }
        Ok(())
    }

    /// `lat,lng` as used by the Google Maps web services.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// A map viewport.
///
/// `west > east` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Check the edges.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` if an edge is out of range or south is above north.
    pub fn validate(&self) -> Result<(), GeoError> {
        GeoPoint {
            lat: self.north,
            lng: self.east,
        }
        .validate()?;
        GeoPoint {
            lat: self.south,
            lng: self.west,
        }
        .validate()?;
        if self.south > self.north {
            return Err(GeoError::InvertedBounds);
        }
        Ok(())
    }

    /// Returns true if the viewport crosses the antimeridian.
    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Returns true if the point lies inside the viewport (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        let lat_ok = (self.south..=self.north).contains(&point.lat);
        let lng_ok = if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            (self.west..=self.east).contains(&point.lng)
        };
        lat_ok && lng_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(35.6812, 139.7671).is_ok());
        assert_eq!(GeoPoint::new(91.0, 0.0), Err(GeoError::Latitude(91.0)));
        assert_eq!(GeoPoint::new(0.0, -181.0), Err(GeoError::Longitude(-181.0)));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_bounds_contains() {
        let tokyo = Bounds {
            north: 35.9,
            south: 35.5,
            east: 139.95,
            west: 139.5,
        };
        assert!(tokyo.validate().is_ok());
        assert!(tokyo.contains(GeoPoint {
            lat: 35.6812,
            lng: 139.7671
        }));
        assert!(!tokyo.contains(GeoPoint {
            lat: 34.7,
            lng: 135.5
        }));
    }

    #[test]
    fn test_bounds_across_antimeridian() {
        let pacific = Bounds {
            north: 10.0,
            south: -10.0,
            east: -170.0,
            west: 170.0,
        };
        assert!(pacific.crosses_antimeridian());
        assert!(pacific.contains(GeoPoint {
            lat: 0.0,
            lng: 179.0
        }));
        assert!(pacific.contains(GeoPoint {
            lat: 0.0,
            lng: -175.0
        }));
        assert!(!pacific.contains(GeoPoint { lat: 0.0, lng: 0.0 }));
    }

    #[test]
    fn test_inverted_bounds() {
        let bounds = Bounds {
            north: 1.0,
            south: 2.0,
            east: 1.0,
            west: 0.0,
        };
        assert_eq!(bounds.validate(), Err(GeoError::InvertedBounds));
    }
}
