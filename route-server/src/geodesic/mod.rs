//! Surface distance between latitude/longitude points.
//!
//! Two tiers are provided: an iterative ellipsoidal solver for the distance
//! figure shown to the courier, and the spherical haversine formula for
//! cheaper secondary sorting. Both are symmetric, non-negative and return
//! exactly zero for coordinate-identical inputs.

mod haversine;
mod vincenty;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Coordinates;

pub use haversine::{EARTH_RADIUS_KM, haversine_km};
pub use vincenty::vincenty_km;

/// Which distance formula to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Ellipsoidal (WGS-84), sub-metre accuracy.
    #[default]
    Vincenty,
    /// Spherical great-circle.
    Haversine,
}

impl DistanceMetric {
    /// Distance in kilometres between two points.
    ///
    /// Arguments are put into a canonical order first so that the result is
    /// bit-for-bit symmetric.
    pub fn distance_km(&self, a: &Coordinates, b: &Coordinates) -> f64 {
        let (p, q) = if (a.lat, a.lng) <= (b.lat, b.lng) {
            (a, b)
        } else {
            (b, a)
        };

        match self {
            DistanceMetric::Vincenty => vincenty_km(p.lat, p.lng, q.lat, q.lng),
            DistanceMetric::Haversine => haversine_km(p.lat, p.lng, q.lat, q.lng),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Vincenty => f.write_str("vincenty"),
            DistanceMetric::Haversine => f.write_str("haversine"),
        }
    }
}

/// Error returned when parsing an unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown distance metric: {0} (expected vincenty or haversine)")]
pub struct UnknownMetric(String);

impl FromStr for DistanceMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vincenty" => Ok(DistanceMetric::Vincenty),
            "haversine" => Ok(DistanceMetric::Haversine),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}
