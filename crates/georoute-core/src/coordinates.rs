//! Geographic coordinates and their textual form.
//!
//! Coordinates are plain WGS84 latitude/longitude pairs in decimal degrees.
//! They are accepted from the command line as `"lat,lng"` strings and from
//! batch requests as `{"lat": .., "lng": ..}` objects.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    /// `lat,lng` with an optional space, semicolon or comma separator.
    static ref COORDINATE_PAIR: Regex = Regex::new(
        r"^\s*(?P<lat>[-+]?\d{1,3}(?:\.\d+)?)\s*[,;\s]\s*(?P<lng>[-+]?\d{1,3}(?:\.\d+)?)\s*$"
    ).expect("Invalid coordinate regex");
}

/// Errors from coordinate parsing and validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Malformed coordinate pair: '{0}' (expected 'lat,lng')")]
    Malformed(String),

    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Coordinate components must be finite numbers")]
    NotFinite,
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, positive north
    pub lat: f64,

    /// Longitude, positive east
    pub lng: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values that are out of range.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        let coords = Self { lat, lng };
        coords.validate()?;
        Ok(coords)
    }

    /// Check that both components are finite and within range.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoordinateError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }

    /// Whether [`validate`](Self::validate) would succeed.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Latitude in radians.
    pub fn lat_radians(&self) -> f64 {
        self.lat.to_radians()
    }

    /// Longitude in radians.
    pub fn lng_radians(&self) -> f64 {
        self.lng.to_radians()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Coordinates {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = COORDINATE_PAIR
            .captures(s)
            .ok_or_else(|| CoordinateError::Malformed(s.to_string()))?;

        let lat = caps["lat"]
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        let lng = caps["lng"]
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;

        Self::try_new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_separated() {
        let coords: Coordinates = "-23.5505,-46.6333".parse().unwrap();
        assert_eq!(coords.lat, -23.5505);
        assert_eq!(coords.lng, -46.6333);
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_semicolon() {
        let coords: Coordinates = "  51.5 ; -0.12 ".parse().unwrap();
        assert_eq!(coords, Coordinates { lat: 51.5, lng: -0.12 });

        let coords: Coordinates = "48.85 2.35".parse().unwrap();
        assert_eq!(coords, Coordinates { lat: 48.85, lng: 2.35 });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "somewhere in Lisbon".parse::<Coordinates>().unwrap_err();
        assert!(matches!(err, CoordinateError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let err = "91.0,10.0".parse::<Coordinates>().unwrap_err();
        assert_eq!(err, CoordinateError::LatitudeOutOfRange(91.0));

        let err = "10.0,-180.5".parse::<Coordinates>().unwrap_err();
        assert_eq!(err, CoordinateError::LongitudeOutOfRange(-180.5));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let coords = Coordinates {
            lat: f64::NAN,
            lng: 0.0,
        };
        assert_eq!(coords.validate(), Err(CoordinateError::NotFinite));
        assert!(!coords.is_valid());
    }

    #[test]
    fn test_display_round_trips() {
        let coords = Coordinates::try_new(-23.5618, -46.6565).unwrap();
        let parsed: Coordinates = coords.to_string().parse().unwrap();
        assert_eq!(parsed, coords);
    }
}
