//! Storage error types.

use std::time::Duration;

use crate::domain::StopId;

/// Errors from the stop store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No stop with this id in any working set
    #[error("stop not found: {0}")]
    NotFound(StopId),

    /// A stop with this id already exists
    #[error("stop already exists: {0}")]
    Duplicate(StopId),

    /// Reading or writing the backing file failed
    #[error("storage I/O error: {message}")]
    Io { message: String },

    /// The operation did not complete within the allowed time
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
}
