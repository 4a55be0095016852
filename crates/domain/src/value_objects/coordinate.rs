//! Geographic coordinate value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used for all great-circle computations
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A geographic coordinate in decimal degrees
///
/// Both components are always finite, latitude lies in [-90, 90] and
/// longitude in [-180, 180]. Coordinates are never mutated, only replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    latitude: f64,
    /// Longitude in degrees (-180 to 180)
    longitude: f64,
}

/// Error type for invalid coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinates {
    /// Rejected latitude
    pub latitude: f64,
    /// Rejected longitude
    pub longitude: f64,
}

impl fmt::Display for InvalidCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid coordinates ({}, {}): latitude must be -90 to 90, longitude must be -180 to 180",
            self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidCoordinates {}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InvalidCoordinates;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a new coordinate with validation
    ///
    /// # Errors
    ///
    /// Returns `InvalidCoordinates` if either component is not finite,
    /// latitude is not in [-90, 90] or longitude is not in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Create a coordinate without validation (for trusted constants)
    ///
    /// Caller must ensure latitude is in [-90, 90] and longitude in [-180, 180]
    #[must_use]
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Get the latitude
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Get the longitude
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to another coordinate in meters
    ///
    /// Uses the Haversine formula.
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let lat1_rad = self.latitude.to_radians();
        let lat2_rad = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (lat1_rad.cos() * lat2_rad.cos()).mul_add(
            (delta_lon / 2.0).sin().powi(2),
            (delta_lat / 2.0).sin().powi(2),
        );
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }

    /// Great-circle distance to another coordinate in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        self.distance_meters(other) / 1000.0
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = String;

    /// Parse `"lat,lng"` (whitespace around either component is ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lat,lng', got '{s}'"))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;
        Self::new(latitude, longitude).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        let loc = Coordinate::new(40.758, -73.9855).expect("valid coordinates");
        assert!((loc.latitude() - 40.758).abs() < f64::EPSILON);
        assert!((loc.longitude() + 73.9855).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boundary_coordinates() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_invalid_latitude() {
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(-91.0, 0.0).is_err());
    }

    #[test]
    fn test_invalid_longitude() {
        assert!(Coordinate::new(0.0, 181.0).is_err());
        assert!(Coordinate::new(0.0, -181.0).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(f64::NEG_INFINITY, f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        let loc = Coordinate::new(52.52, 13.405).expect("valid");
        assert_eq!(loc.to_string(), "52.520000,13.405000");
    }

    #[test]
    fn test_from_str() {
        let loc: Coordinate = "40.7580, -73.9855".parse().expect("parse");
        assert!((loc.latitude() - 40.758).abs() < f64::EPSILON);
        assert!("40.7580".parse::<Coordinate>().is_err());
        assert!("abc,1".parse::<Coordinate>().is_err());
        assert!("95,1".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_distance_same_location() {
        let loc = Coordinate::new(52.52, 13.405).expect("valid");
        assert!(loc.distance_meters(&loc).abs() < 0.001);
    }

    #[test]
    fn test_distance_berlin_london() {
        let berlin = Coordinate::new(52.52, 13.405).expect("valid");
        let london = Coordinate::new(51.5074, -0.1278).expect("valid");
        // Berlin to London is approximately 930km
        assert!((berlin.distance_km(&london) - 930.0).abs() < 50.0);
    }

    #[test]
    fn test_serialization() {
        let loc = Coordinate::new(52.52, 13.405).expect("valid");
        let json = serde_json::to_string(&loc).expect("serialize");
        assert!(json.contains("52.52"));

        let deserialized: Coordinate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loc, deserialized);
    }

    #[test]
    fn test_deserialization_validates() {
        let result: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 120.0, "longitude": 0.0}"#);
        assert!(result.is_err());
    }
}
