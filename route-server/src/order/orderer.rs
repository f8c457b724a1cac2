//! Spatial ordering of stops around an origin.

use serde::Serialize;
use tracing::debug;

use crate::cache::DistanceCache;
use crate::domain::{Coordinates, Stop};

use super::cluster::greedy_clusters;
use super::config::OrderConfig;

/// A stop in its ordered position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedStop {
    /// The stop, with `order_index` assigned.
    #[serde(flatten)]
    pub stop: Stop,

    /// Distance from the origin in kilometres. `None` for stops without
    /// usable coordinates.
    pub distance_km: Option<f64>,

    /// Cluster number (0-based, in visiting order) when clustering was on.
    pub cluster: Option<usize>,
}

/// Result of one ordering pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedRoute {
    /// Origin snapshot every distance was measured from.
    pub origin: Coordinates,

    /// Whether nearby stops were grouped.
    pub clustered: bool,

    /// Stops in visiting order.
    pub stops: Vec<OrderedStop>,
}

impl OrderedRoute {
    /// An empty route.
    pub fn empty(origin: Coordinates) -> Self {
        Self {
            origin,
            clustered: false,
            stops: Vec::new(),
        }
    }

    /// Number of stops in the route.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Returns true if the route has no stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// A stop with its validated location and distance, during ordering.
struct Located {
    stop: Stop,
    point: Coordinates,
    distance_km: f64,
}

/// Orders stops into an approximately short visiting sequence.
///
/// The ordering is a heuristic over straight-line distances: nearest first,
/// optionally grouping stops that lie close together so a courier finishes
/// one neighbourhood before moving on.
pub struct RouteOrderer<'a> {
    cache: &'a DistanceCache,
    config: &'a OrderConfig,
}

impl<'a> RouteOrderer<'a> {
    /// Create a new orderer.
    pub fn new(cache: &'a DistanceCache, config: &'a OrderConfig) -> Self {
        Self { cache, config }
    }

    /// Order `stops` from `origin`.
    ///
    /// Returns a permutation of the input with `order_index` set to 1..=N.
    /// Located stops come first, coordinate-less stops last. The function
    /// is pure apart from populating the distance cache.
    pub fn order(&self, stops: Vec<Stop>, origin: Coordinates, cluster_nearby: bool) -> OrderedRoute {
        if stops.is_empty() {
            return OrderedRoute::empty(origin);
        }

        let total = stops.len();
        let (mut located, mut unlocated) = self.partition(stops, &origin);

        // Stable: equal distances keep input order.
        located.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        let mut ordered: Vec<OrderedStop> = Vec::with_capacity(total);

        if cluster_nearby {
            self.append_clustered(located, &mut ordered);
        } else {
            ordered.extend(located.into_iter().map(|l| OrderedStop {
                stop: l.stop,
                distance_km: Some(l.distance_km),
                cluster: None,
            }));
        }

        unlocated.sort_by(|a, b| unlocated_key(a).cmp(&unlocated_key(b)));
        ordered.extend(unlocated.into_iter().map(|stop| OrderedStop {
            stop,
            distance_km: None,
            cluster: None,
        }));

        for (i, entry) in ordered.iter_mut().enumerate() {
            entry.stop.order_index = (i + 1) as u32;
        }

        debug!(
            stops = total,
            clustered = cluster_nearby,
            cache_hits = self.cache.hits(),
            cache_misses = self.cache.misses(),
            "ordered route"
        );

        OrderedRoute {
            origin,
            clustered: cluster_nearby,
            stops: ordered,
        }
    }

    /// Split into located stops (with distances) and coordinate-less stops.
    fn partition(&self, stops: Vec<Stop>, origin: &Coordinates) -> (Vec<Located>, Vec<Stop>) {
        let mut located = Vec::new();
        let mut unlocated = Vec::new();

        for stop in stops {
            match stop.location() {
                Some(point) => {
                    let distance_km = self.cache.get_or_compute(origin, &point);
                    located.push(Located {
                        stop,
                        point,
                        distance_km,
                    });
                }
                None => unlocated.push(stop),
            }
        }

        (located, unlocated)
    }

    /// Group sorted stops into clusters and append them cluster by cluster.
    fn append_clustered(&self, located: Vec<Located>, out: &mut Vec<OrderedStop>) {
        let points: Vec<Coordinates> = located.iter().map(|l| l.point).collect();
        let mut clusters = greedy_clusters(&points, self.config.cluster_radius_km, self.cache);

        clusters.sort_by(|a, b| {
            located[a.seed()]
                .distance_km
                .total_cmp(&located[b.seed()].distance_km)
        });

        let mut slots: Vec<Option<Located>> = located.into_iter().map(Some).collect();
        for (cluster_no, cluster) in clusters.iter().enumerate() {
            for &idx in &cluster.members {
                if let Some(l) = slots[idx].take() {
                    out.push(OrderedStop {
                        stop: l.stop,
                        distance_km: Some(l.distance_km),
                        cluster: Some(cluster_no),
                    });
                }
            }
        }
    }
}

/// Secondary sort key for stops without coordinates.
fn unlocated_key(stop: &Stop) -> (&str, &str) {
    (stop.status.reason().unwrap_or(""), stop.name.as_str())
}
