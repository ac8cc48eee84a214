//! Coordinates, bounding boxes and great-circle distance

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean Earth radius used by [`haversine_km`]
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// National sanity box for Tunisia. Anything outside is rejected.
pub const TUNISIA_BOUNDS: BoundingBox = BoundingBox {
    lat_min: 30.0,
    lat_max: 38.0,
    lon_min: 7.0,
    lon_max: 12.0,
};

/// WGS84 point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the valid WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Shift by the given degree offsets
    pub fn offset(&self, dlat: f64, dlon: f64) -> Self {
        Self::new(self.latitude + dlat, self.longitude + dlon)
    }
}

/// Axis-aligned latitude/longitude box, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Finite and non-inverted
    pub fn is_valid(&self) -> bool {
        [self.lat_min, self.lat_max, self.lon_min, self.lon_max]
            .iter()
            .all(|v| v.is_finite())
            && self.lat_min <= self.lat_max
            && self.lon_min <= self.lon_max
    }

    pub fn contains(&self, c: &Coordinate) -> bool {
        c.latitude >= self.lat_min
            && c.latitude <= self.lat_max
            && c.longitude >= self.lon_min
            && c.longitude <= self.lon_max
    }

    /// Nearest point of the box to `c` (identity when inside)
    pub fn clamp(&self, c: &Coordinate) -> Coordinate {
        Coordinate::new(
            c.latitude.clamp(self.lat_min, self.lat_max),
            c.longitude.clamp(self.lon_min, self.lon_max),
        )
    }
}

/// Haversine distance between two points in km
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * PI / 180.0;
    let lat2_rad = lat2 * PI / 180.0;
    let dlat = (lat2 - lat1) * PI / 180.0;
    let dlon = (lon2 - lon1) * PI / 180.0;

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let c = 2.0 * a.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let d = haversine_km(36.8065, 10.1815, 36.8065, 10.1815);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_haversine_tunis_sfax() {
        // Tunis to Sfax: ~235 km as the crow flies
        let d = haversine_km(36.8065, 10.1815, 34.7406, 10.7603);
        assert!((d - 235.0).abs() < 10.0, "Tunis-Sfax: {}", d);
    }

    #[test]
    fn test_haversine_symmetric() {
        let ab = haversine_km(36.8622, 10.1950, 35.8256, 10.6369);
        let ba = haversine_km(35.8256, 10.6369, 36.8622, 10.1950);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_bounds_contains_and_clamp() {
        let tunis = Coordinate::new(36.8065, 10.1815);
        let paris = Coordinate::new(48.8566, 2.3522);
        assert!(TUNISIA_BOUNDS.contains(&tunis));
        assert!(!TUNISIA_BOUNDS.contains(&paris));

        let clamped = TUNISIA_BOUNDS.clamp(&paris);
        assert_eq!(clamped, Coordinate::new(38.0, 7.0));
        assert_eq!(TUNISIA_BOUNDS.clamp(&tunis), tunis);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(TUNISIA_BOUNDS.is_valid());
        assert!(!BoundingBox::new(37.0, 36.0, 10.0, 11.0).is_valid());
        assert!(!BoundingBox::new(f64::NAN, 36.0, 10.0, 11.0).is_valid());
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(36.8, 10.1).is_valid());
        assert!(!Coordinate::new(91.0, 10.1).is_valid());
        assert!(!Coordinate::new(36.8, f64::INFINITY).is_valid());
    }
}
