//! Memoized origin-to-stop distances.
//!
//! Re-ordering runs repeatedly over the same stops, usually with the origin
//! unchanged or moved only slightly. Distances are cached per working set,
//! keyed on coordinates quantized to six decimal places (about 0.1 m), so
//! repeated queries for the same logical point always hit.
//!
//! No TTL is needed: an entry is only ever valid for its exact coordinates.
//! The capacity bound exists to cap memory for long-running processes.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache as MokaCache;

use crate::domain::Coordinates;
use crate::geodesic::DistanceMetric;

/// Scale applied before rounding: six decimal places.
const KEY_SCALE: f64 = 1e6;

/// Canonical cache key: `(origin_lat, origin_lng, point_lat, point_lng)` in
/// millionths of a degree.
///
/// Integer micro-degrees avoid any dependence on float-to-string formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([i64; 4]);

impl CacheKey {
    pub fn new(origin: &Coordinates, point: &Coordinates) -> Self {
        Self([
            quantize(origin.lat),
            quantize(origin.lng),
            quantize(point.lat),
            quantize(point.lng),
        ])
    }
}

/// Round a degree value to an integer count of micro-degrees.
fn quantize(deg: f64) -> i64 {
    (deg * KEY_SCALE).round() as i64
}

/// Configuration for the distance cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Formula used on a miss.
    pub metric: DistanceMetric,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            metric: DistanceMetric::Vincenty,
        }
    }
}

/// Distance cache for one working set.
pub struct DistanceCache {
    entries: MokaCache<CacheKey, f64>,
    metric: DistanceMetric,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DistanceCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self {
            entries,
            metric: config.metric,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Distance from `origin` to `point` in kilometres, computing it on a miss.
    ///
    /// The first computation for a key wins: later queries whose coordinates
    /// round to the same key get that value back.
    pub fn get_or_compute(&self, origin: &Coordinates, point: &Coordinates) -> f64 {
        let key = CacheKey::new(origin, point);

        if let Some(km) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return km;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let km = self.metric.distance_km(origin, point);
        self.entries.insert(key, km);
        km
    }

    /// The metric used for misses.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that had to compute.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
