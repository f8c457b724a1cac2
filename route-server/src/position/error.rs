//! Position error types.

use crate::store::StoreError;

use super::sensor::SensorError;

/// Errors from the position provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PositionError {
    /// Every detection attempt failed
    #[error("position unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: SensorError },

    /// The chosen origin could not be saved or cleared
    #[error("failed to persist origin: {0}")]
    Persist(#[from] StoreError),
}
