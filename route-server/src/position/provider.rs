//! Origin tracking for one working set.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Coordinates, FixedOrigin, Origin, WorkingSet};
use crate::store::{StopStore, with_timeout};

use super::config::PositionConfig;
use super::error::PositionError;
use super::sensor::{PositionSensor, SensorError, Watch, WatchId};

/// Where the provider is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    /// Not started.
    Uninitialized,
    /// Waiting for the first live fix.
    Acquiring,
    /// Following the device.
    Live(Coordinates),
    /// Detection failed; using the configured default until a fix arrives.
    Defaulted(Coordinates),
    /// Manually set point; live updates suspended.
    Fixed(FixedOrigin),
}

impl PositionState {
    /// The point this state yields, if it carries one.
    pub fn point(&self) -> Option<Coordinates> {
        match self {
            PositionState::Live(p) | PositionState::Defaulted(p) => Some(*p),
            PositionState::Fixed(f) => Some(f.point),
            PositionState::Uninitialized | PositionState::Acquiring => None,
        }
    }

    /// The origin mode this state corresponds to.
    pub fn origin(&self) -> Origin {
        match self {
            PositionState::Fixed(f) => Origin::Fixed(f.clone()),
            _ => Origin::Live,
        }
    }
}

#[derive(Debug)]
struct Tracked {
    state: PositionState,
    /// Bumped on every mode switch. Work started under an older generation
    /// must not write its result.
    generation: u64,
}

/// The live watch subscription and the task draining it.
struct ActiveWatch {
    id: WatchId,
    task: JoinHandle<()>,
}

/// Supplies the origin for one working set.
///
/// Either follows the device (live) or holds a persisted manual point
/// (fixed). [`current_origin`](Self::current_origin) never waits: before a
/// fix is available it answers with the configured default point.
pub struct PositionProvider<S: PositionSensor, St: StopStore> {
    working_set: WorkingSet,
    sensor: Arc<S>,
    store: Arc<St>,
    config: PositionConfig,
    tracked: Arc<RwLock<Tracked>>,
    active: Mutex<Option<ActiveWatch>>,
    changes: Arc<watch::Sender<u64>>,
}

impl<S: PositionSensor, St: StopStore> PositionProvider<S, St> {
    /// Create a provider. Call [`start`](Self::start) to begin tracking.
    pub fn new(working_set: WorkingSet, sensor: Arc<S>, store: Arc<St>, config: PositionConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            working_set,
            sensor,
            store,
            config,
            tracked: Arc::new(RwLock::new(Tracked {
                state: PositionState::Uninitialized,
                generation: 0,
            })),
            active: Mutex::new(None),
            changes: Arc::new(changes),
        }
    }

    /// Restore the persisted mode: fixed if an origin was saved, else live.
    pub async fn start(&self) {
        let saved = with_timeout(
            self.config.storage_timeout(),
            self.store.get_origin(self.working_set),
        )
        .await;

        match saved {
            Ok(Some(Origin::Fixed(fixed))) => {
                info!(working_set = %self.working_set, point = %fixed.point, "restored fixed origin");
                self.switch(PositionState::Fixed(fixed)).await;
            }
            Ok(_) => self.start_live().await,
            Err(e) => {
                warn!(working_set = %self.working_set, error = %e, "failed to load origin, using live");
                self.start_live().await;
            }
        }
    }

    /// Switch to live tracking.
    ///
    /// Subscribes to continuous updates, then detects an initial fix (with
    /// retries), falling back to the default point if that fails. Updates
    /// that arrive during detection are buffered and applied after it.
    pub async fn start_live(&self) {
        let generation = self.switch(PositionState::Acquiring).await;

        let watch = match self.sensor.watch() {
            Ok(watch) => Some(watch),
            Err(e) => {
                warn!(working_set = %self.working_set, error = %e, "failed to watch position");
                None
            }
        };

        let initial = match self.detect_with_retries().await {
            Ok(point) => PositionState::Live(point),
            Err(e) => {
                warn!(
                    working_set = %self.working_set,
                    error = %e,
                    fallback = %self.config.default_point,
                    "position unavailable, using default origin"
                );
                PositionState::Defaulted(self.config.default_point)
            }
        };

        if !self.apply(generation, initial).await {
            debug!(working_set = %self.working_set, "mode changed during acquisition");
            if let Some(watch) = watch {
                self.sensor.clear_watch(watch.id);
            }
            return;
        }

        if let Some(watch) = watch {
            self.follow(watch, generation).await;
        }
    }

    /// Fix the origin at `point` and persist it.
    ///
    /// Live updates stop before the switch. The new origin is used even if
    /// persisting it fails; the error is returned for reporting.
    pub async fn set_fixed(&self, point: Coordinates, name: Option<String>) -> Result<(), PositionError> {
        let fixed = FixedOrigin { point, name };
        self.switch(PositionState::Fixed(fixed.clone())).await;
        info!(working_set = %self.working_set, %point, "origin fixed");

        with_timeout(
            self.config.storage_timeout(),
            self.store.set_origin(self.working_set, Origin::Fixed(fixed)),
        )
        .await?;
        Ok(())
    }

    /// Forget the fixed origin and go back to live tracking.
    pub async fn use_live(&self) -> Result<(), PositionError> {
        self.cancel_watch().await;
        let cleared = with_timeout(
            self.config.storage_timeout(),
            self.store.clear_origin(self.working_set),
        )
        .await;

        self.start_live().await;
        cleared.map_err(PositionError::from)
    }

    /// One manual detection, with retries.
    ///
    /// In live mode a successful fix also becomes the current origin.
    pub async fn detect(&self) -> Result<Coordinates, PositionError> {
        let generation = self.tracked.read().await.generation;
        let point = self.detect_with_retries().await?;

        let mut tracked = self.tracked.write().await;
        if tracked.generation == generation && !matches!(tracked.state, PositionState::Fixed(_)) {
            tracked.state = PositionState::Live(point);
            drop(tracked);
            self.notify();
        }
        Ok(point)
    }

    /// The origin to measure from right now.
    pub async fn current_origin(&self) -> Coordinates {
        self.tracked
            .read()
            .await
            .state
            .point()
            .unwrap_or(self.config.default_point)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> PositionState {
        self.tracked.read().await.state.clone()
    }

    /// The working set this provider serves.
    pub fn working_set(&self) -> WorkingSet {
        self.working_set
    }

    /// Receiver that changes whenever the origin does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Stop live tracking without changing the state.
    pub async fn shutdown(&self) {
        self.cancel_watch().await;
    }

    /// Try the sensor up to `max_attempts` times.
    async fn detect_with_retries(&self) -> Result<Coordinates, PositionError> {
        let attempts = self.config.max_attempts.max(1);
        let timeout = self.config.attempt_timeout();
        let mut last = SensorError::Timeout;

        for attempt in 1..=attempts {
            let result = match tokio::time::timeout(timeout, self.sensor.current_position(timeout)).await {
                Ok(result) => result,
                Err(_) => Err(SensorError::Timeout),
            };

            match result {
                Ok(point) => match point.validate() {
                    Ok(()) => return Ok(point),
                    Err(e) => last = SensorError::Unavailable(e.to_string()),
                },
                Err(e) => last = e,
            }

            debug!(working_set = %self.working_set, attempt, error = %last, "position attempt failed");
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_backoff()).await;
            }
        }

        Err(PositionError::Unavailable { attempts, last })
    }

    /// Cancel any subscription, enter `state` and start a new generation.
    async fn switch(&self, state: PositionState) -> u64 {
        // Held across the bump so `follow` cannot install a watch for the
        // generation being retired.
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.task.abort();
            self.sensor.clear_watch(previous.id);
        }

        let mut tracked = self.tracked.write().await;
        tracked.generation += 1;
        tracked.state = state;
        let generation = tracked.generation;
        drop(tracked);
        drop(active);

        self.notify();
        generation
    }

    /// Enter `state` if no switch happened since `generation`.
    async fn apply(&self, generation: u64, state: PositionState) -> bool {
        let mut tracked = self.tracked.write().await;
        if tracked.generation != generation {
            return false;
        }
        tracked.state = state;
        drop(tracked);

        self.notify();
        true
    }

    /// Drain `watch` into the state until cancelled or superseded.
    async fn follow(&self, mut watch: Watch, generation: u64) {
        let mut active = self.active.lock().await;
        if self.tracked.read().await.generation != generation {
            self.sensor.clear_watch(watch.id);
            return;
        }

        let id = watch.id;
        let tracked = Arc::clone(&self.tracked);
        let changes = Arc::clone(&self.changes);
        let working_set = self.working_set;

        let task = tokio::spawn(async move {
            while let Some(update) = watch.updates.recv().await {
                let point = match update {
                    Ok(point) if point.validate().is_ok() => point,
                    Ok(point) => {
                        warn!(%working_set, %point, "ignoring out-of-range position update");
                        continue;
                    }
                    Err(e) => {
                        warn!(%working_set, error = %e, "position update failed, keeping last origin");
                        continue;
                    }
                };

                let mut guard = tracked.write().await;
                if guard.generation != generation {
                    break;
                }
                guard.state = PositionState::Live(point);
                drop(guard);
                changes.send_modify(|v| *v = v.wrapping_add(1));
            }
        });

        if let Some(previous) = active.replace(ActiveWatch { id, task }) {
            previous.task.abort();
            self.sensor.clear_watch(previous.id);
        }
    }

    /// Unsubscribe from live updates, if subscribed.
    async fn cancel_watch(&self) {
        if let Some(active) = self.active.lock().await.take() {
            active.task.abort();
            self.sensor.clear_watch(active.id);
            debug!(working_set = %self.working_set, "live position watch cleared");
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }
}

impl<S: PositionSensor, St: StopStore> Drop for PositionProvider<S, St> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.task.abort();
            self.sensor.clear_watch(active.id);
        }
    }
}
