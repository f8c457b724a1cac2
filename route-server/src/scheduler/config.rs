//! Re-order scheduling settings.

use std::time::Duration;

/// Configuration for [`super::ReorderScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between picking up a trigger and starting the run (milliseconds).
    pub debounce_ms: u64,

    /// Background check interval (milliseconds).
    pub tick_ms: u64,

    /// Upper bound on each storage read or write (seconds).
    pub storage_timeout_secs: u64,

    /// Whether nearby stops are grouped initially.
    pub cluster_nearby: bool,
}

impl SchedulerConfig {
    /// Returns the debounce delay as a Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the tick interval as a Duration.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Returns the storage timeout as a Duration.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            tick_ms: 50,
            storage_timeout_secs: 30,
            cluster_nearby: false,
        }
    }
}
