//! Sensor fed by fixes the courier's device pushes over HTTP.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

use crate::domain::{Coordinates, InvalidCoordinates};

use super::sensor::{PositionSensor, SensorError, Watch, WatchId, Watchers};

/// How old a pushed fix may be and still answer a one-shot request.
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct Fix {
    point: Coordinates,
    at: Instant,
}

/// A [`PositionSensor`] whose fixes arrive via [`PushSensor::push`].
///
/// One-shot requests are answered from a recent enough fix, or by waiting
/// for the next push.
pub struct PushSensor {
    latest: watch::Sender<Option<Fix>>,
    watchers: Mutex<Watchers>,
    max_age: Duration,
}

impl PushSensor {
    /// Create a sensor with no fix yet.
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_AGE)
    }

    /// Create a sensor that accepts cached fixes up to `max_age` old.
    pub fn with_max_age(max_age: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest,
            watchers: Mutex::new(Watchers::default()),
            max_age,
        }
    }

    /// Record a new fix from the device.
    pub fn push(&self, point: Coordinates) -> Result<(), InvalidCoordinates> {
        point.validate()?;
        trace!(%point, "position pushed");

        self.latest.send_replace(Some(Fix {
            point,
            at: Instant::now(),
        }));
        self.broadcast(&Ok(point));
        Ok(())
    }

    /// Record a failure reported by the device (e.g. permission revoked).
    pub fn push_error(&self, error: SensorError) {
        self.broadcast(&Err(error));
    }

    /// Number of active watch subscriptions.
    pub fn watcher_count(&self) -> usize {
        self.with_watchers(|w| w.len())
    }

    fn broadcast(&self, update: &Result<Coordinates, SensorError>) {
        self.with_watchers(|w| w.broadcast(update));
    }

    fn with_watchers<T>(&self, f: impl FnOnce(&mut Watchers) -> T) -> T {
        let mut guard = match self.watchers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Default for PushSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSensor for PushSensor {
    async fn current_position(&self, timeout: Duration) -> Result<Coordinates, SensorError> {
        let mut rx = self.latest.subscribe();

        let cached = *rx.borrow_and_update();
        if let Some(fix) = cached
            && fix.at.elapsed() <= self.max_age
        {
            return Ok(fix.point);
        }

        match tokio::time::timeout(timeout, rx.changed()).await {
            Ok(Ok(())) => {
                let fix = *rx.borrow();
                fix.map(|f| f.point)
                    .ok_or_else(|| SensorError::Unavailable("no fix received".to_string()))
            }
            Ok(Err(_)) => Err(SensorError::Unavailable("sensor closed".to_string())),
            Err(_) => Err(SensorError::Timeout),
        }
    }

    fn watch(&self) -> Result<Watch, SensorError> {
        Ok(self.with_watchers(|w| w.add()))
    }

    fn clear_watch(&self, id: WatchId) {
        self.with_watchers(|w| w.remove(id));
    }
}
