//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::cache::CacheConfig;
use crate::domain::Coordinates;
use crate::geodesic::DistanceMetric;
use crate::order::{DEFAULT_CLUSTER_RADIUS_KM, OrderConfig};
use crate::position::{DEFAULT_POINT, PositionConfig};
use crate::scheduler::SchedulerConfig;

/// Top-level configuration.
///
/// Every setting is optional. A value that is present but unparseable is
/// reported and the default used instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address (`ROUTE_BIND_ADDR`).
    pub bind_addr: SocketAddr,

    /// File persisting fixed origins (`ROUTE_ORIGIN_FILE`).
    pub origin_file: PathBuf,

    /// Origin used when detection fails (`ROUTE_DEFAULT_LAT`, `ROUTE_DEFAULT_LNG`).
    pub default_point: Coordinates,

    /// Scheduler debounce delay in milliseconds (`ROUTE_DEBOUNCE_MS`).
    pub debounce_ms: u64,

    /// Whether nearby stops start out grouped (`ROUTE_CLUSTER_NEARBY`).
    pub cluster_nearby: bool,

    /// Cluster threshold in kilometres (`ROUTE_CLUSTER_RADIUS_KM`).
    pub cluster_radius_km: f64,

    /// Distance formula (`ROUTE_DISTANCE_METRIC`).
    pub metric: DistanceMetric,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            origin_file: PathBuf::from("origins.json"),
            default_point: DEFAULT_POINT,
            debounce_ms: SchedulerConfig::default().debounce_ms,
            cluster_nearby: false,
            cluster_radius_km: DEFAULT_CLUSTER_RADIUS_KM,
            metric: DistanceMetric::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_point = {
            let lat = parse_or(&lookup, "ROUTE_DEFAULT_LAT", defaults.default_point.lat);
            let lng = parse_or(&lookup, "ROUTE_DEFAULT_LNG", defaults.default_point.lng);
            Coordinates::new(lat, lng).unwrap_or_else(|e| {
                warn!(error = %e, "invalid default origin, using built-in default");
                defaults.default_point
            })
        };

        let cluster_radius_km = parse_or(&lookup, "ROUTE_CLUSTER_RADIUS_KM", defaults.cluster_radius_km);
        let cluster_radius_km = if cluster_radius_km.is_finite() && cluster_radius_km > 0.0 {
            cluster_radius_km
        } else {
            warn!(value = cluster_radius_km, "cluster radius must be positive, using default");
            defaults.cluster_radius_km
        };

        Self {
            bind_addr: parse_or(&lookup, "ROUTE_BIND_ADDR", defaults.bind_addr),
            origin_file: lookup("ROUTE_ORIGIN_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.origin_file),
            default_point,
            debounce_ms: parse_or(&lookup, "ROUTE_DEBOUNCE_MS", defaults.debounce_ms),
            cluster_nearby: parse_or(&lookup, "ROUTE_CLUSTER_NEARBY", defaults.cluster_nearby),
            cluster_radius_km,
            metric: parse_or(&lookup, "ROUTE_DISTANCE_METRIC", defaults.metric),
        }
    }

    pub fn position(&self) -> PositionConfig {
        PositionConfig {
            default_point: self.default_point,
            ..PositionConfig::default()
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce_ms: self.debounce_ms,
            cluster_nearby: self.cluster_nearby,
            ..SchedulerConfig::default()
        }
    }

    pub fn order(&self) -> OrderConfig {
        OrderConfig::new(self.cluster_radius_km)
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            metric: self.metric,
            ..CacheConfig::default()
        }
    }
}

/// Parse `key` if set, warning and falling back to `default` if it doesn't parse.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, "invalid configuration value, using default");
                default
            }
        },
    }
}
