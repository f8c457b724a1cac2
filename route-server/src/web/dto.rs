//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, FixedOrigin, Stop, WorkingSet};
use crate::position::PositionState;
use crate::scheduler::RouteSnapshot;
use crate::store::StatusChange;

/// Current route of a working set.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub working_set: WorkingSet,

    /// Where distances are currently measured from
    pub origin: OriginResponse,

    /// Whether nearby stops are grouped
    pub cluster_nearby: bool,

    /// True while a re-order run is in flight
    pub ordering: bool,

    /// True when a re-order is pending
    pub stale: bool,

    /// Most recent completed run, if any
    pub route: Option<RouteSnapshot>,

    /// Error from the most recent run, if it failed
    pub error: Option<String>,
}

/// Origin of a working set.
#[derive(Debug, Serialize)]
pub struct OriginResponse {
    /// Provider state: uninitialized, acquiring, live, defaulted or fixed
    pub state: &'static str,

    /// The point in use right now
    pub point: Coordinates,

    /// Name of a fixed origin
    pub name: Option<String>,
}

impl OriginResponse {
    /// Describe `state`, using `current` as the point in use.
    pub fn new(state: &PositionState, current: Coordinates) -> Self {
        let (label, name) = match state {
            PositionState::Uninitialized => ("uninitialized", None),
            PositionState::Acquiring => ("acquiring", None),
            PositionState::Live(_) => ("live", None),
            PositionState::Defaulted(_) => ("defaulted", None),
            PositionState::Fixed(FixedOrigin { name, .. }) => ("fixed", name.clone()),
        };
        Self {
            state: label,
            point: current,
            name,
        }
    }
}

/// Request to fix the origin.
#[derive(Debug, Deserialize)]
pub struct SetOriginRequest {
    pub lat: f64,
    pub lng: f64,

    /// Optional label, e.g. "Depot"
    pub name: Option<String>,
}

/// A position fix pushed by the device.
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Request to toggle clustering.
#[derive(Debug, Deserialize, Serialize)]
pub struct ClusterRequest {
    pub enabled: bool,
}

/// Request to add a stop.
#[derive(Debug, Deserialize)]
pub struct CreateStopRequest {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub address: String,

    pub note: Option<String>,

    /// Omit for stops not yet geocoded
    pub coordinates: Option<Coordinates>,

    /// Defaults to today
    pub working_set: Option<WorkingSet>,
}

impl CreateStopRequest {
    /// The stop this request describes.
    pub fn into_stop(self) -> Stop {
        Stop {
            phone: self.phone,
            address: self.address,
            note: self.note,
            coordinates: self.coordinates,
            ..Stop::new(self.id, self.name)
        }
    }
}

/// Request to report a problem with a stop.
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
}

/// Where a stop went after a status change.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub from: WorkingSet,

    /// `None` once delivered
    pub to: Option<WorkingSet>,
}

impl From<StatusChange> for StatusResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            from: change.from,
            to: change.to,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
