//! Re-order run errors.

use crate::store::StoreError;

/// A recoverable failure of one re-order run.
///
/// Neither variant stops the scheduler; the next trigger runs normally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReorderError {
    /// The stop list could not be read; the previous route stays current
    #[error("failed to load stops: {0}")]
    Load(#[source] StoreError),

    /// Some ordinals were not written back; the new order is still displayed
    #[error("failed to persist {failed} of {total} order updates: {first}")]
    Persistence {
        failed: usize,
        total: usize,
        first: StoreError,
    },
}
