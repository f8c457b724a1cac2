//! Test doubles shared across module test suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, watch};

use crate::domain::{Coordinates, Origin, Stop, StopId, StopStatus, WorkingSet};
use crate::scheduler::OriginSource;
use crate::store::{InMemoryStore, StatusChange, StopStore, StoreError};

/// An [`InMemoryStore`] whose reads and writes can be made to fail, and
/// whose operations can be slowed down.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    pub inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    delay_ms: AtomicU64,
    order_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every list read by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Successful `update_order_index` calls so far.
    pub fn order_writes(&self) -> usize {
        self.order_writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                message: "disk full".into(),
            });
        }
        Ok(())
    }
}

impl StopStore for FlakyStore {
    async fn list_stops(&self, working_set: WorkingSet) -> Result<Vec<Stop>, StoreError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                message: "connection reset".into(),
            });
        }
        self.inner.list_stops(working_set).await
    }

    async fn update_order_index(&self, id: &StopId, index: u32) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.update_order_index(id, index).await?;
        self.order_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_status(
        &self,
        id: &StopId,
        status: StopStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, StoreError> {
        self.check_write()?;
        self.inner.set_status(id, status, at).await
    }

    async fn insert_stop(&self, working_set: WorkingSet, stop: Stop) -> Result<(), StoreError> {
        self.inner.insert_stop(working_set, stop).await
    }

    async fn delete_stop(&self, id: &StopId) -> Result<WorkingSet, StoreError> {
        self.inner.delete_stop(id).await
    }

    async fn get_origin(&self, working_set: WorkingSet) -> Result<Option<Origin>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                message: "connection reset".into(),
            });
        }
        self.inner.get_origin(working_set).await
    }

    async fn set_origin(&self, working_set: WorkingSet, origin: Origin) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.set_origin(working_set, origin).await
    }

    async fn clear_origin(&self, working_set: WorkingSet) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.clear_origin(working_set).await
    }
}

/// An origin the test moves by hand.
pub(crate) struct ManualOrigin {
    point: RwLock<Coordinates>,
    changes: watch::Sender<u64>,
}

impl ManualOrigin {
    pub fn new(point: Coordinates) -> Arc<Self> {
        let (changes, _) = watch::channel(0);
        Arc::new(Self {
            point: RwLock::new(point),
            changes,
        })
    }

    pub async fn move_to(&self, point: Coordinates) {
        *self.point.write().await = point;
        self.changes.send_modify(|v| *v += 1);
    }
}

impl OriginSource for ManualOrigin {
    async fn current_origin(&self) -> Coordinates {
        *self.point.read().await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// A validated point.
pub(crate) fn pt(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).unwrap()
}
