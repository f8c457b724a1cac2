//! Configuration for route ordering.

/// Default radius for grouping nearby stops (kilometres).
pub const DEFAULT_CLUSTER_RADIUS_KM: f64 = 0.5;

/// Parameters for [`super::RouteOrderer`].
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Stops within this distance of a cluster's seed join that cluster.
    pub cluster_radius_km: f64,
}

impl OrderConfig {
    /// Create a configuration with the given cluster radius.
    pub fn new(cluster_radius_km: f64) -> Self {
        Self { cluster_radius_km }
    }
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            cluster_radius_km: DEFAULT_CLUSTER_RADIUS_KM,
        }
    }
}
