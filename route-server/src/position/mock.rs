//! Scripted sensor for testing without a device.
//!
//! One-shot requests are answered from a queue of scripted outcomes; watch
//! subscribers receive whatever the test emits.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::Coordinates;

use super::sensor::{PositionSensor, PositionUpdate, SensorError, Watch, WatchId, Watchers};

/// Outcome of one scripted `current_position` call.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Answer with this fix.
    Fix(Coordinates),
    /// Fail with this error.
    Fail(SensorError),
    /// Never answer; the caller's timeout decides.
    Hang,
}

#[derive(Debug, Default)]
struct ScriptState {
    queue: VecDeque<Scripted>,
    watchers: Watchers,
    cleared: Vec<WatchId>,
}

/// Sensor that replays a script.
///
/// When the script runs out, every further request fails with
/// `SensorError::Unavailable`.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    state: Mutex<ScriptState>,
    requests: AtomicUsize,
}

impl ScriptedSensor {
    /// Create a sensor with the given one-shot outcomes.
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                queue: script.into_iter().collect(),
                ..ScriptState::default()
            }),
            requests: AtomicUsize::new(0),
        }
    }

    /// A sensor whose every request fails.
    pub fn failing() -> Self {
        Self::new([])
    }

    /// Send an update to every active watch subscriber.
    pub fn emit(&self, update: PositionUpdate) {
        self.with_state(|s| s.watchers.broadcast(&update));
    }

    /// Number of `current_position` calls so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of active watch subscriptions.
    pub fn active_watches(&self) -> usize {
        self.with_state(|s| s.watchers.len())
    }

    /// Ids passed to `clear_watch`, in call order.
    pub fn cleared(&self) -> Vec<WatchId> {
        self.with_state(|s| s.cleared.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl PositionSensor for ScriptedSensor {
    async fn current_position(&self, _timeout: Duration) -> Result<Coordinates, SensorError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let next = self.with_state(|s| s.queue.pop_front());

        match next {
            Some(Scripted::Fix(point)) => Ok(point),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(SensorError::Unavailable("script exhausted".to_string())),
        }
    }

    fn watch(&self) -> Result<Watch, SensorError> {
        Ok(self.with_state(|s| s.watchers.add()))
    }

    fn clear_watch(&self, id: WatchId) {
        self.with_state(|s| {
            s.watchers.remove(id);
            s.cleared.push(id);
        });
    }
}
