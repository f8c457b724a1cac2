//! In-memory stop store with file-backed origins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{FixedOrigin, Origin, Stop, StopId, StopStatus, WorkingSet};

use super::error::StoreError;
use super::origin_file::OriginFile;
use super::{StatusChange, StopStore};

#[derive(Debug, Default)]
struct Inner {
    today: Vec<Stop>,
    reported: Vec<Stop>,
    delivered: Vec<Stop>,
    origins: HashMap<WorkingSet, FixedOrigin>,
}

impl Inner {
    fn set(&self, ws: WorkingSet) -> &Vec<Stop> {
        match ws {
            WorkingSet::Today => &self.today,
            WorkingSet::Reported => &self.reported,
        }
    }

    fn set_mut(&mut self, ws: WorkingSet) -> &mut Vec<Stop> {
        match ws {
            WorkingSet::Today => &mut self.today,
            WorkingSet::Reported => &mut self.reported,
        }
    }

    /// Locate a stop: its working set and position within it.
    fn find(&self, id: &StopId) -> Option<(WorkingSet, usize)> {
        WorkingSet::ALL.into_iter().find_map(|ws| {
            self.set(ws)
                .iter()
                .position(|s| &s.id == id)
                .map(|pos| (ws, pos))
        })
    }
}

/// Thread-safe in-memory store.
///
/// Stops live only as long as the process. Fixed origins are additionally
/// written to an [`OriginFile`] when one is configured, so they survive a
/// restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    origin_file: Option<OriginFile>,
}

impl InMemoryStore {
    /// Create an empty store with no origin persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose fixed origins are loaded from and saved to `file`.
    pub fn with_origin_file(file: OriginFile) -> Result<Self, StoreError> {
        let origins = file.load()?;
        debug!(path = %file.path().display(), count = origins.len(), "loaded fixed origins");

        Ok(Self {
            inner: RwLock::new(Inner {
                origins,
                ..Inner::default()
            }),
            origin_file: Some(file),
        })
    }

    /// Stops delivered so far, oldest first.
    pub async fn delivered(&self) -> Vec<Stop> {
        self.inner.read().await.delivered.clone()
    }

    fn persist_origins(&self, origins: &HashMap<WorkingSet, FixedOrigin>) -> Result<(), StoreError> {
        match &self.origin_file {
            Some(file) => file.save(origins),
            None => Ok(()),
        }
    }
}

impl StopStore for InMemoryStore {
    async fn list_stops(&self, working_set: WorkingSet) -> Result<Vec<Stop>, StoreError> {
        Ok(self.inner.read().await.set(working_set).clone())
    }

    async fn update_order_index(&self, id: &StopId, index: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let (ws, pos) = inner
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        inner.set_mut(ws)[pos].order_index = index;
        Ok(())
    }

    async fn set_status(
        &self,
        id: &StopId,
        status: StopStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, StoreError> {
        let mut inner = self.inner.write().await;
        let (from, pos) = inner
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let to = match &status {
            StopStatus::Delivered => None,
            StopStatus::Reported { .. } => Some(WorkingSet::Reported),
            StopStatus::Pending => Some(WorkingSet::Today),
        };

        if to == Some(from) {
            let stop = &mut inner.set_mut(from)[pos];
            if stop.status != status {
                stop.status = status;
                stop.status_changed_at = Some(at);
            }
            return Ok(StatusChange { from, to });
        }

        let mut stop = inner.set_mut(from).remove(pos);
        stop.status = status;
        stop.status_changed_at = Some(at);
        stop.order_index = 0;

        match to {
            Some(ws) => inner.set_mut(ws).push(stop),
            None => inner.delivered.push(stop),
        }

        Ok(StatusChange { from, to })
    }

    async fn insert_stop(&self, working_set: WorkingSet, stop: Stop) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.find(&stop.id).is_some() {
            return Err(StoreError::Duplicate(stop.id));
        }
        if let Some(e) = stop.coordinate_error() {
            warn!(stop = %stop.id, error = %e, "stop has invalid coordinates, it will be left unordered");
        }
        inner.set_mut(working_set).push(stop);
        Ok(())
    }

    async fn delete_stop(&self, id: &StopId) -> Result<WorkingSet, StoreError> {
        let mut inner = self.inner.write().await;
        let (ws, pos) = inner
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        inner.set_mut(ws).remove(pos);
        Ok(ws)
    }

    async fn get_origin(&self, working_set: WorkingSet) -> Result<Option<Origin>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.origins.get(&working_set).cloned().map(Origin::Fixed))
    }

    async fn set_origin(&self, working_set: WorkingSet, origin: Origin) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match origin {
            Origin::Fixed(fixed) => {
                inner.origins.insert(working_set, fixed);
            }
            Origin::Live => {
                inner.origins.remove(&working_set);
            }
        }
        self.persist_origins(&inner.origins)
    }

    async fn clear_origin(&self, working_set: WorkingSet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.origins.remove(&working_set).is_some() {
            self.persist_origins(&inner.origins)?;
        }
        Ok(())
    }
}
