//! Storage collaborator for stops and origins.
//!
//! The ordering core only needs a handful of record operations: list a
//! working set, write back ordinals and statuses, and read/write the fixed
//! origin. [`StopStore`] captures exactly that; [`InMemoryStore`] is the
//! implementation the server runs with.

mod error;
mod memory;
mod origin_file;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Origin, Stop, StopId, StopStatus, WorkingSet};

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use origin_file::OriginFile;

/// Where a stop moved as the result of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Working set the stop was in.
    pub from: WorkingSet,
    /// Working set it is in now; `None` once delivered.
    pub to: Option<WorkingSet>,
}

impl StatusChange {
    /// Working sets whose contents changed.
    pub fn affected(&self) -> Vec<WorkingSet> {
        match self.to {
            Some(to) if to != self.from => vec![self.from, to],
            _ => vec![self.from],
        }
    }
}

/// Record store for stops and origins.
///
/// Implementations must be safe to call concurrently; per-stop ordinal
/// updates may be issued in parallel and land in any order.
pub trait StopStore: Send + Sync + 'static {
    /// Current stops of a working set.
    fn list_stops(
        &self,
        working_set: WorkingSet,
    ) -> impl Future<Output = Result<Vec<Stop>, StoreError>> + Send;

    /// Set a stop's display ordinal.
    fn update_order_index(
        &self,
        id: &StopId,
        index: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Change a stop's status, moving it between working sets as needed.
    fn set_status(
        &self,
        id: &StopId,
        status: StopStatus,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<StatusChange, StoreError>> + Send;

    /// Add a stop to a working set.
    fn insert_stop(
        &self,
        working_set: WorkingSet,
        stop: Stop,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a stop, returning the working set it was in.
    fn delete_stop(
        &self,
        id: &StopId,
    ) -> impl Future<Output = Result<WorkingSet, StoreError>> + Send;

    /// The persisted origin of a working set, if one was set.
    fn get_origin(
        &self,
        working_set: WorkingSet,
    ) -> impl Future<Output = Result<Option<Origin>, StoreError>> + Send;

    /// Persist the origin of a working set.
    fn set_origin(
        &self,
        working_set: WorkingSet,
        origin: Origin,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Forget the persisted origin (back to live).
    fn clear_origin(
        &self,
        working_set: WorkingSet,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Await a storage operation, failing with [`StoreError::Timeout`] after `limit`.
pub async fn with_timeout<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
