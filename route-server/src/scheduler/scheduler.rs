//! The re-order coalescing loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::cache::{CacheConfig, DistanceCache};
use crate::domain::{StopId, WorkingSet};
use crate::order::{OrderConfig, OrderedRoute, RouteOrderer};
use crate::store::{StopStore, StoreError, with_timeout};

use super::OriginSource;
use super::config::SchedulerConfig;
use super::error::ReorderError;

/// Why a re-order was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First run after the scheduler starts.
    Startup,
    /// Stops were added, removed or changed status.
    StopsChanged,
    /// The origin moved or changed mode.
    OriginChanged,
    /// The clustering flag was toggled.
    ClusteringChanged,
    /// Explicit request.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Startup => "startup",
            Trigger::StopsChanged => "stops changed",
            Trigger::OriginChanged => "origin changed",
            Trigger::ClusteringChanged => "clustering changed",
            Trigger::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// A completed run, as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    /// Run number; later snapshots supersede earlier ones.
    pub generation: u64,

    /// The ordered route.
    pub route: OrderedRoute,

    /// Whether every changed ordinal was written back.
    pub persisted: bool,

    pub completed_at: DateTime<Utc>,
}

struct Shared<St, O> {
    working_set: WorkingSet,
    store: Arc<St>,
    origin: Arc<O>,
    config: SchedulerConfig,
    order_config: OrderConfig,
    cache: DistanceCache,

    needs_reorder: AtomicBool,
    is_ordering: AtomicBool,
    cluster_nearby: AtomicBool,

    wake: Notify,
    runs: AtomicU64,
    published: watch::Sender<Option<Arc<RouteSnapshot>>>,
    last_error: RwLock<Option<ReorderError>>,
}

/// Coalesces re-order triggers for one working set.
///
/// Cheap to clone; clones share state.
pub struct ReorderScheduler<St, O> {
    shared: Arc<Shared<St, O>>,
}

impl<St, O> Clone for ReorderScheduler<St, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<St: StopStore, O: OriginSource> ReorderScheduler<St, O> {
    /// Create a scheduler. Nothing runs until [`spawn`](Self::spawn).
    pub fn new(
        working_set: WorkingSet,
        store: Arc<St>,
        origin: Arc<O>,
        config: SchedulerConfig,
        order_config: OrderConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        let (published, _) = watch::channel(None);
        let cluster_nearby = AtomicBool::new(config.cluster_nearby);

        Self {
            shared: Arc::new(Shared {
                working_set,
                store,
                origin,
                config,
                order_config,
                cache: DistanceCache::new(cache_config),
                needs_reorder: AtomicBool::new(false),
                is_ordering: AtomicBool::new(false),
                cluster_nearby,
                wake: Notify::new(),
                runs: AtomicU64::new(0),
                published,
                last_error: RwLock::new(None),
            }),
        }
    }

    /// Start the background loop, with an initial run.
    pub fn spawn(&self) -> JoinHandle<()> {
        self.trigger(Trigger::Startup);
        tokio::spawn(self.clone().run())
    }

    /// Mark the route stale.
    pub fn trigger(&self, reason: Trigger) {
        let shared = &self.shared;
        shared.needs_reorder.store(true, Ordering::SeqCst);
        shared.wake.notify_one();
        trace!(working_set = %shared.working_set, %reason, "re-order triggered");
    }

    /// Turn grouping of nearby stops on or off. Triggers only on change.
    pub fn set_cluster_nearby(&self, enabled: bool) {
        if self.shared.cluster_nearby.swap(enabled, Ordering::SeqCst) != enabled {
            self.trigger(Trigger::ClusteringChanged);
        }
    }

    pub fn cluster_nearby(&self) -> bool {
        self.shared.cluster_nearby.load(Ordering::SeqCst)
    }

    pub fn needs_reorder(&self) -> bool {
        self.shared.needs_reorder.load(Ordering::SeqCst)
    }

    pub fn is_ordering(&self) -> bool {
        self.shared.is_ordering.load(Ordering::SeqCst)
    }

    /// Number of orderer invocations so far.
    pub fn runs(&self) -> u64 {
        self.shared.runs.load(Ordering::SeqCst)
    }

    pub fn working_set(&self) -> WorkingSet {
        self.shared.working_set
    }

    /// The most recently completed run.
    pub fn latest(&self) -> Option<Arc<RouteSnapshot>> {
        self.shared.published.borrow().clone()
    }

    /// Receiver that changes on every completed run.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<RouteSnapshot>>> {
        self.shared.published.subscribe()
    }

    /// Error from the most recent run, if it failed.
    pub async fn last_error(&self) -> Option<ReorderError> {
        self.shared.last_error.read().await.clone()
    }

    /// The scheduling loop. Runs until the task is aborted.
    pub async fn run(self) {
        let mut origin_changes = self.shared.origin.changes();
        let mut origin_open = true;
        let mut tick = tokio::time::interval(self.shared.config.tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shared.wake.notified() => {}
                _ = tick.tick() => {}
                changed = origin_changes.changed(), if origin_open => match changed {
                    Ok(()) => self.trigger(Trigger::OriginChanged),
                    Err(_) => origin_open = false,
                },
            }

            if self.needs_reorder() && !self.is_ordering() {
                self.run_debounced(&mut origin_changes).await;
            }
        }
    }

    /// Wait one debounce period, then run once, unless a run is already in
    /// flight.
    ///
    /// The wait is fixed and never restarted. Triggers that land during it
    /// are covered by the snapshot taken afterwards; triggers after that
    /// cause a single follow-up run.
    async fn run_debounced(&self, origin_changes: &mut watch::Receiver<u64>) {
        let shared = &self.shared;
        if shared.is_ordering.swap(true, Ordering::SeqCst) {
            return;
        }
        shared.needs_reorder.store(false, Ordering::SeqCst);

        tokio::time::sleep(shared.config.debounce()).await;

        // The snapshot below reads the latest stops and origin.
        shared.needs_reorder.store(false, Ordering::SeqCst);
        origin_changes.borrow_and_update();

        let outcome = self.run_once().await;
        match outcome {
            Ok(()) => *shared.last_error.write().await = None,
            Err(e) => {
                warn!(working_set = %shared.working_set, error = %e, "re-order run failed");
                *shared.last_error.write().await = Some(e);
            }
        }

        shared.is_ordering.store(false, Ordering::SeqCst);
    }

    /// Snapshot, order, persist, publish.
    async fn run_once(&self) -> Result<(), ReorderError> {
        let shared = &self.shared;
        let timeout = shared.config.storage_timeout();

        let stops = with_timeout(timeout, shared.store.list_stops(shared.working_set))
            .await
            .map_err(ReorderError::Load)?;
        let origin = shared.origin.current_origin().await;
        let cluster_nearby = shared.cluster_nearby.load(Ordering::SeqCst);

        let previous: HashMap<StopId, u32> = stops
            .iter()
            .map(|s| (s.id.clone(), s.order_index))
            .collect();

        let generation = shared.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let route = RouteOrderer::new(&shared.cache, &shared.order_config).order(
            stops,
            origin,
            cluster_nearby,
        );

        let changed: Vec<(StopId, u32)> = route
            .stops
            .iter()
            .filter(|s| previous.get(&s.stop.id) != Some(&s.stop.order_index))
            .map(|s| (s.stop.id.clone(), s.stop.order_index))
            .collect();

        let results = join_all(
            changed
                .iter()
                .map(|(id, index)| with_timeout(timeout, shared.store.update_order_index(id, *index))),
        )
        .await;
        let failures: Vec<StoreError> = results.into_iter().filter_map(Result::err).collect();

        debug!(
            working_set = %shared.working_set,
            generation,
            stops = route.len(),
            updated = changed.len(),
            failed = failures.len(),
            %origin,
            cluster_nearby,
            "re-order complete"
        );

        shared.published.send_replace(Some(Arc::new(RouteSnapshot {
            generation,
            route,
            persisted: failures.is_empty(),
            completed_at: Utc::now(),
        })));

        let failed = failures.len();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(ReorderError::Persistence {
                failed,
                total: changed.len(),
                first,
            }),
        }
    }
}
