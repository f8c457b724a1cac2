//! Delivery stops.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::{Coordinates, InvalidCoordinates};

/// Opaque unique identifier of a stop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Delivery status of a stop within an active working set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopStatus {
    #[default]
    Pending,
    Delivered,
    Reported { reason: String },
}

impl StopStatus {
    /// The report reason, if this status carries one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            StopStatus::Reported { reason } => Some(reason),
            _ => None,
        }
    }
}

/// A single delivery target.
///
/// Stops are copied from the address catalog when added to a route; they do
/// not reference the catalog row afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub note: Option<String>,

    /// Absent until geocoded. May hold out-of-range values if written by an
    /// older client; see [`Stop::location`].
    #[serde(default)]
    pub coordinates: Option<Coordinates>,

    /// Display ordinal, 1-based. Zero means "not yet ordered".
    #[serde(default)]
    pub order_index: u32,

    #[serde(default)]
    pub status: StopStatus,

    /// When the status last changed away from `Pending`.
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl Stop {
    /// Create a pending stop with no coordinates.
    pub fn new(id: impl Into<StopId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: String::new(),
            address: String::new(),
            note: None,
            coordinates: None,
            order_index: 0,
            status: StopStatus::Pending,
            status_changed_at: None,
        }
    }

    /// Builder-style setter for coordinates (unchecked).
    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates { lat, lng });
        self
    }

    /// Coordinates usable for ordering.
    ///
    /// Returns `None` both when the stop has not been geocoded and when the
    /// stored pair fails range validation. Called on every ordering run, so
    /// it stays quiet; stores report bad coordinates once, on insert.
    pub fn location(&self) -> Option<Coordinates> {
        let point = self.coordinates?;
        point.validate().ok().map(|()| point)
    }

    /// Why the stored coordinates are unusable, if they are present but out
    /// of range.
    pub fn coordinate_error(&self) -> Option<InvalidCoordinates> {
        self.coordinates?.validate().err()
    }
}

impl From<String> for StopId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
