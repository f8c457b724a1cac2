//! Deciding when to re-order.
//!
//! Stop-list changes, origin moves and clustering toggles all mark the
//! route as stale. The scheduler coalesces them: it waits a fixed debounce
//! delay after the first trigger, runs the orderer once on a snapshot taken
//! after that delay, writes the new ordinals back, and never has more than one run
//! in flight. Triggers that arrive mid-run cause exactly one follow-up.

mod config;
mod error;
#[allow(clippy::module_inception)]
mod scheduler;


use std::future::Future;

use tokio::sync::watch;

use crate::domain::Coordinates;
use crate::position::{PositionProvider, PositionSensor};
use crate::store::StopStore;

pub use config::SchedulerConfig;
pub use error::ReorderError;
pub use scheduler::{ReorderScheduler, RouteSnapshot, Trigger};

/// Where the scheduler gets its origin from.
///
/// This abstraction allows the scheduler to be tested without a sensor.
pub trait OriginSource: Send + Sync + 'static {
    /// The origin to use for a run.
    fn current_origin(&self) -> impl Future<Output = Coordinates> + Send;

    /// Receiver that changes whenever the origin moves.
    fn changes(&self) -> watch::Receiver<u64>;
}

impl<S: PositionSensor, St: StopStore> OriginSource for PositionProvider<S, St> {
    async fn current_origin(&self) -> Coordinates {
        PositionProvider::current_origin(self).await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.subscribe()
    }
}
