//! The position-sensing collaborator.
//!
//! Mirrors the usual geolocation contract: a one-shot "current position"
//! request with a timeout, and a watch subscription that streams fixes until
//! it is cleared.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::Coordinates;

/// Errors reported by a position sensor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The user or platform refused access to location
    #[error("location permission denied")]
    PermissionDenied,

    /// No fix could be obtained
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time
    #[error("position request timed out")]
    Timeout,
}

/// A fix or failure delivered on a watch subscription.
pub type PositionUpdate = Result<Coordinates, SensorError>;

/// Handle identifying an active watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// An active watch subscription.
#[derive(Debug)]
pub struct Watch {
    pub id: WatchId,
    pub updates: mpsc::UnboundedReceiver<PositionUpdate>,
}

/// Source of device positions.
///
/// This abstraction allows the provider to be tested with scripted fixes.
pub trait PositionSensor: Send + Sync + 'static {
    /// Request a single fix, failing after `timeout`.
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinates, SensorError>> + Send;

    /// Start streaming fixes.
    fn watch(&self) -> Result<Watch, SensorError>;

    /// Stop a subscription. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}

/// Registry of watch subscriptions, shared by sensor implementations.
#[derive(Debug, Default)]
pub struct Watchers {
    next_id: u64,
    senders: HashMap<WatchId, mpsc::UnboundedSender<PositionUpdate>>,
}

impl Watchers {
    /// Register a new subscription.
    pub fn add(&mut self) -> Watch {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(id, tx);
        Watch { id, updates: rx }
    }

    /// Drop a subscription, closing its channel. Returns false if unknown.
    pub fn remove(&mut self, id: WatchId) -> bool {
        self.senders.remove(&id).is_some()
    }

    /// Deliver an update to every subscriber, forgetting closed ones.
    pub fn broadcast(&mut self, update: &PositionUpdate) {
        self.senders.retain(|_, tx| tx.send(update.clone()).is_ok());
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
