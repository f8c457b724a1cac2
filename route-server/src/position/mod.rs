//! Origin positions for route ordering.
//!
//! A [`PositionProvider`] per working set answers "where are distances
//! measured from right now": the courier's live device position, or a
//! manually fixed point that is persisted across restarts. Detection is
//! bounded by per-attempt timeouts and a retry budget; when it fails the
//! provider falls back to a configured default so ordering never blocks.

mod config;
mod error;
pub mod mock;
mod provider;
mod push;
mod sensor;

pub use config::{DEFAULT_POINT, PositionConfig};
pub use error::PositionError;
pub use mock::{Scripted, ScriptedSensor};
pub use provider::{PositionProvider, PositionState};
pub use push::PushSensor;
pub use sensor::{PositionSensor, PositionUpdate, SensorError, Watch, WatchId, Watchers};
