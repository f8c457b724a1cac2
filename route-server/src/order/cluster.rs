//! Greedy first-seed-wins clustering.
//!
//! Walks the distance-sorted stops; the nearest unassigned stop becomes a
//! seed and claims every later unassigned stop within the radius of it.
//! A claimed stop is never reassigned, even if it is closer to a later seed.

use crate::cache::DistanceCache;
use crate::domain::Coordinates;

/// A group of stops, as indices into the sorted input.
///
/// The first member is the seed; members keep their input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<usize>,
}

impl Cluster {
    /// Index of the seed stop.
    pub fn seed(&self) -> usize {
        self.members[0]
    }
}

/// Group `points` (already sorted by distance from origin) into clusters.
///
/// Returned clusters are in seed order, which for sorted input is ascending
/// seed distance from origin.
pub fn greedy_clusters(
    points: &[Coordinates],
    radius_km: f64,
    cache: &DistanceCache,
) -> Vec<Cluster> {
    let mut assigned = vec![false; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];

        for candidate in (seed + 1)..points.len() {
            if assigned[candidate] {
                continue;
            }
            if cache.get_or_compute(&points[seed], &points[candidate]) <= radius_km {
                assigned[candidate] = true;
                members.push(candidate);
            }
        }

        clusters.push(Cluster { members });
    }

    clusters
}
