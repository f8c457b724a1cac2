//! Route ordering.
//!
//! Given an origin and the stops of one working set, produce a visiting
//! order: nearest-first by geodesic distance, optionally grouping stops that
//! lie within a small radius of each other. Stops without coordinates are
//! placed after all located stops.
//!
//! This is a heuristic spatial sort, not a road-network solver.

mod cluster;
mod config;
mod orderer;

#[cfg(test)]
mod orderer_tests;

pub use cluster::{Cluster, greedy_clusters};
pub use config::{DEFAULT_CLUSTER_RADIUS_KM, OrderConfig};
pub use orderer::{OrderedRoute, OrderedStop, RouteOrderer};
