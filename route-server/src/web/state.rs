//! Application state for the web layer.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::WorkingSet;
use crate::position::{PositionProvider, PushSensor};
use crate::scheduler::{ReorderScheduler, Trigger};
use crate::store::{InMemoryStore, StatusChange};

/// Position provider as wired into the server.
pub type Provider = PositionProvider<PushSensor, InMemoryStore>;

/// Re-order scheduler as wired into the server.
pub type Scheduler = ReorderScheduler<InMemoryStore, Provider>;

/// Everything serving one working set.
pub struct RouteHandle {
    /// Receives fixes pushed by the device
    pub sensor: Arc<PushSensor>,

    /// Origin for this working set
    pub provider: Arc<Provider>,

    /// Re-orders this working set
    pub scheduler: Scheduler,
}

impl RouteHandle {
    fn new(working_set: WorkingSet, store: &Arc<InMemoryStore>, config: &AppConfig) -> Self {
        let sensor = Arc::new(PushSensor::new());
        let provider = Arc::new(PositionProvider::new(
            working_set,
            Arc::clone(&sensor),
            Arc::clone(store),
            config.position(),
        ));
        let scheduler = ReorderScheduler::new(
            working_set,
            Arc::clone(store),
            Arc::clone(&provider),
            config.scheduler(),
            config.order(),
            &config.cache(),
        );

        Self {
            sensor,
            provider,
            scheduler,
        }
    }
}

/// Shared application state.
///
/// Each working set has its own origin, scheduler and distance cache.
#[derive(Clone)]
pub struct AppState {
    /// Stop and origin storage
    pub store: Arc<InMemoryStore>,

    today: Arc<RouteHandle>,
    reported: Arc<RouteHandle>,
}

impl AppState {
    /// Create a new app state. Nothing runs until [`start`](Self::start).
    pub fn new(store: InMemoryStore, config: &AppConfig) -> Self {
        let store = Arc::new(store);
        Self {
            today: Arc::new(RouteHandle::new(WorkingSet::Today, &store, config)),
            reported: Arc::new(RouteHandle::new(WorkingSet::Reported, &store, config)),
            store,
        }
    }

    /// Handle for a working set.
    pub fn route(&self, working_set: WorkingSet) -> &RouteHandle {
        match working_set {
            WorkingSet::Today => &self.today,
            WorkingSet::Reported => &self.reported,
        }
    }

    /// Start origin tracking and scheduling for every working set.
    ///
    /// Position acquisition runs in the background; schedulers order from the
    /// default point until it completes.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        for working_set in WorkingSet::ALL {
            let handle = self.route(working_set);

            let provider = Arc::clone(&handle.provider);
            tasks.push(tokio::spawn(async move { provider.start().await }));
            tasks.push(handle.scheduler.spawn());
            info!(%working_set, "route scheduling started");
        }
        tasks
    }

    /// Mark the routes touched by a status change as stale.
    pub fn stops_changed(&self, change: StatusChange) {
        for working_set in change.affected() {
            self.route(working_set).scheduler.trigger(Trigger::StopsChanged);
        }
    }
}
