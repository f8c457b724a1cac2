//! Geographic coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a latitude/longitude pair is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates ({lat}, {lng}): {reason}")]
pub struct InvalidCoordinates {
    pub lat: f64,
    pub lng: f64,
    reason: &'static str,
}

/// A WGS-84 latitude/longitude pair in decimal degrees.
///
/// Values built with [`Coordinates::new`] are guaranteed to be finite and in
/// range. Values deserialized from storage are not checked until
/// [`Coordinates::validate`] is called, since persisted data may predate the
/// range rules.
///
/// # Examples
///
/// ```
/// use route_server::domain::Coordinates;
///
/// let p = Coordinates::new(16.8833, 99.1250).unwrap();
/// assert_eq!(p.lat, 16.8833);
///
/// assert!(Coordinates::new(91.0, 0.0).is_err());
/// assert!(Coordinates::new(0.0, -180.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create a validated coordinate pair.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinates> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check that both components are finite and within range.
    pub fn validate(&self) -> Result<(), InvalidCoordinates> {
        let reject = |reason| InvalidCoordinates {
            lat: self.lat,
            lng: self.lng,
            reason,
        };

        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(reject("components must be finite"));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(reject("latitude must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(reject("longitude must be within [-180, 180]"));
        }
        Ok(())
    }

    /// Returns `(lat, lng)` in radians.
    pub fn to_radians(&self) -> (f64, f64) {
        (self.lat.to_radians(), self.lng.to_radians())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}
