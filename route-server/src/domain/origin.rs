//! Route origins and the working sets they belong to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// One of the two independent stop collections.
///
/// Each working set has its own origin and its own ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingSet {
    /// Today's delivery route.
    Today,
    /// Stops that were reported as problems.
    Reported,
}

impl WorkingSet {
    pub const ALL: [WorkingSet; 2] = [WorkingSet::Today, WorkingSet::Reported];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingSet::Today => "today",
            WorkingSet::Reported => "reported",
        }
    }
}

impl fmt::Display for WorkingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown working set name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown working set: {0}")]
pub struct UnknownWorkingSet(String);

impl FromStr for WorkingSet {
    type Err = UnknownWorkingSet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(WorkingSet::Today),
            "reported" => Ok(WorkingSet::Reported),
            other => Err(UnknownWorkingSet(other.to_string())),
        }
    }
}

/// A manually chosen origin point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedOrigin {
    pub point: Coordinates,
    #[serde(default)]
    pub name: Option<String>,
}

/// The point route distances are measured from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Origin {
    /// Follow the device's live position.
    Live,
    /// Use a persisted, manually set point.
    Fixed(FixedOrigin),
}
