//! Position acquisition settings.

use std::time::Duration;

use crate::domain::Coordinates;

/// Origin used when no position can be obtained (Tak, Thailand).
pub const DEFAULT_POINT: Coordinates = Coordinates {
    lat: 16.8833,
    lng: 99.1250,
};

/// Configuration for [`super::PositionProvider`].
#[derive(Debug, Clone)]
pub struct PositionConfig {
    /// Fallback origin when detection fails.
    pub default_point: Coordinates,

    /// Detection attempts before giving up.
    pub max_attempts: u32,

    /// Pause between failed attempts (milliseconds).
    pub retry_backoff_ms: u64,

    /// Time allowed for a single attempt (milliseconds).
    pub attempt_timeout_ms: u64,

    /// Upper bound on origin reads and writes to storage (seconds).
    pub storage_timeout_secs: u64,
}

impl PositionConfig {
    /// Returns the retry backoff as a Duration.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Returns the per-attempt timeout as a Duration.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Returns the storage timeout as a Duration.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            default_point: DEFAULT_POINT,
            max_attempts: 5,
            retry_backoff_ms: 2_000,
            attempt_timeout_ms: 12_000,
            storage_timeout_secs: 30,
        }
    }
}
