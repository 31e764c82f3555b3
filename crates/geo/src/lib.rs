//! Geospatial primitives for geofinder.
//!
//! This crate provides:
//! - Haversine great-circle distance on a 6371 km sphere
//! - A validated [`Coordinate`] type
//! - Order-preserving radius filtering with optional parallelism
//!
//! # Example
//!
//! ```
//! use geofinder_geo::{haversine_distance, Coordinate};
//!
//! let plaza = Coordinate::new(-32.4877, -58.2342);
//! let pharmacy = Coordinate::new(-32.4901, -58.2298);
//!
//! let km = haversine_distance(&plaza, &pharmacy);
//! assert!((km - 0.47).abs() < 0.05);
//! ```

mod error;
mod haversine;
pub mod radius;

pub use error::{GeoError, GeoErrorCode, Result};
pub use haversine::{distance, haversine_distance, round_to, EARTH_RADIUS_KM};
pub use radius::{distances_from, within_radius, Located};

/// A geographic coordinate with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Origin of the lat/lng grid, where equator meets prime meridian.
    pub const NULL_ISLAND: Coordinate = Coordinate { latitude: 0.0, longitude: 0.0 };

    /// Creates a new coordinate without validating it.
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting non-finite or out-of-range values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!("({latitude}, {longitude})")))
        }
    }

    /// Returns true if both components are finite and within range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Exactly `(0, 0)`. Usually a sign that a lookup failed upstream.
    #[inline]
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(Coordinate::try_new(-32.48, -58.23).is_ok());
        let err = Coordinate::try_new(95.0, 0.0).unwrap_err();
        assert_eq!(err.code(), GeoErrorCode::InvalidCoordinate);
    }

    #[test]
    fn test_null_island() {
        assert!(Coordinate::NULL_ISLAND.is_null_island());
        assert!(!Coordinate::new(0.0, 0.0001).is_null_island());
    }

    #[test]
    fn test_coordinate_from_tuple() {
        let coord: Coordinate = (-32.4877, -58.2342).into();
        assert_eq!(coord.latitude, -32.4877);
        assert_eq!(coord.longitude, -58.2342);
    }
}
