//! Web layer for the route server.
//!
//! JSON endpoints for reading ordered routes, steering origins and
//! clustering, receiving device fixes, and changing stops.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, Provider, RouteHandle, Scheduler};
