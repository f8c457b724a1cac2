//! Delivery route server.
//!
//! Keeps each working set of delivery stops in a short visiting order:
//! nearest first from the courier's origin, optionally finishing one
//! neighbourhood before moving on, re-ordered whenever the stops or the
//! origin change.

pub mod cache;
pub mod config;
pub mod domain;
pub mod geodesic;
pub mod order;
pub mod position;
pub mod scheduler;
pub mod store;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
