//! Domain types for delivery route ordering.
//!
//! Stops, coordinates, origins and working sets. Coordinates built through
//! the checked constructor are valid by construction; stored values are
//! re-validated before they are used for ordering.

mod coords;
mod origin;
mod stop;

pub use coords::{Coordinates, InvalidCoordinates};
pub use origin::{FixedOrigin, Origin, UnknownWorkingSet, WorkingSet};
pub use stop::{Stop, StopId, StopStatus};
