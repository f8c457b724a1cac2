//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::domain::{Coordinates, InvalidCoordinates, StopId, StopStatus, UnknownWorkingSet, WorkingSet};
use crate::position::PositionError;
use crate::scheduler::Trigger;
use crate::store::{StopStore, StoreError};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/routes/:ws", get(get_route))
        .route("/api/routes/:ws/reorder", post(reorder))
        .route("/api/routes/:ws/cluster", put(set_cluster))
        .route(
            "/api/routes/:ws/origin",
            get(get_origin).put(set_origin).delete(clear_origin),
        )
        .route("/api/routes/:ws/origin/detect", post(detect_origin))
        .route("/api/routes/:ws/position", post(push_position))
        .route("/api/stops", post(create_stop))
        .route("/api/stops/:id", axum::routing::delete(delete_stop))
        .route("/api/stops/:id/deliver", post(deliver_stop))
        .route("/api/stops/:id/report", post(report_stop))
        .route("/api/stops/:id/restore", post(restore_stop))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn working_set(raw: &str) -> Result<WorkingSet, AppError> {
    Ok(raw.parse()?)
}

async fn origin_response(state: &AppState, ws: WorkingSet) -> OriginResponse {
    let provider = &state.route(ws).provider;
    OriginResponse::new(&provider.state().await, provider.current_origin().await)
}

/// Latest ordered route with scheduler status.
async fn get_route(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<RouteResponse>, AppError> {
    let ws = working_set(&ws)?;
    let scheduler = &state.route(ws).scheduler;

    Ok(Json(RouteResponse {
        working_set: ws,
        origin: origin_response(&state, ws).await,
        cluster_nearby: scheduler.cluster_nearby(),
        ordering: scheduler.is_ordering(),
        stale: scheduler.needs_reorder(),
        route: scheduler.latest().map(|snapshot| (*snapshot).clone()),
        error: scheduler.last_error().await.map(|e| e.to_string()),
    }))
}

/// Request a re-order.
async fn reorder(State(state): State<AppState>, Path(ws): Path<String>) -> Result<StatusCode, AppError> {
    let ws = working_set(&ws)?;
    state.route(ws).scheduler.trigger(Trigger::Manual);
    Ok(StatusCode::ACCEPTED)
}

/// Turn grouping of nearby stops on or off.
async fn set_cluster(
    State(state): State<AppState>,
    Path(ws): Path<String>,
    Json(req): Json<ClusterRequest>,
) -> Result<Json<ClusterRequest>, AppError> {
    let ws = working_set(&ws)?;
    let scheduler = &state.route(ws).scheduler;
    scheduler.set_cluster_nearby(req.enabled);

    Ok(Json(ClusterRequest {
        enabled: scheduler.cluster_nearby(),
    }))
}

async fn get_origin(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<OriginResponse>, AppError> {
    let ws = working_set(&ws)?;
    Ok(Json(origin_response(&state, ws).await))
}

/// Fix the origin at a chosen point.
///
/// The new origin is in use even when saving it fails; the failure is
/// still reported.
async fn set_origin(
    State(state): State<AppState>,
    Path(ws): Path<String>,
    Json(req): Json<SetOriginRequest>,
) -> Result<Json<OriginResponse>, AppError> {
    let ws = working_set(&ws)?;
    let point = Coordinates::new(req.lat, req.lng)?;
    let name = req.name.filter(|n| !n.trim().is_empty());

    state.route(ws).provider.set_fixed(point, name).await?;
    Ok(Json(origin_response(&state, ws).await))
}

/// Forget the fixed origin and go back to live tracking.
///
/// Acquisition can take a while, so it runs in the background.
async fn clear_origin(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<StatusCode, AppError> {
    let ws = working_set(&ws)?;
    let provider = std::sync::Arc::clone(&state.route(ws).provider);

    tokio::spawn(async move {
        if let Err(e) = provider.use_live().await {
            warn!(working_set = %ws, error = %e, "failed to clear saved origin");
        }
    });
    Ok(StatusCode::ACCEPTED)
}

/// Detect the current position once, with retries.
async fn detect_origin(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<Coordinates>, AppError> {
    let ws = working_set(&ws)?;
    let point = state.route(ws).provider.detect().await?;
    Ok(Json(point))
}

/// Accept a fix from the courier's device.
async fn push_position(
    State(state): State<AppState>,
    Path(ws): Path<String>,
    Json(req): Json<PositionRequest>,
) -> Result<StatusCode, AppError> {
    let ws = working_set(&ws)?;
    let point = Coordinates::new(req.lat, req.lng)?;
    state.route(ws).sensor.push(point)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a stop to a working set.
async fn create_stop(
    State(state): State<AppState>,
    Json(req): Json<CreateStopRequest>,
) -> Result<(StatusCode, Json<crate::domain::Stop>), AppError> {
    if req.id.trim().is_empty() {
        return Err(AppError::BadRequest {
            message: "stop id must not be empty".to_string(),
        });
    }
    if let Some(point) = &req.coordinates {
        point.validate()?;
    }

    let ws = req.working_set.unwrap_or(WorkingSet::Today);
    let stop = req.into_stop();
    state.store.insert_stop(ws, stop.clone()).await?;
    state.route(ws).scheduler.trigger(Trigger::StopsChanged);

    info!(stop = %stop.id, working_set = %ws, "stop added");
    Ok((StatusCode::CREATED, Json(stop)))
}

async fn delete_stop(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    let ws = state.store.delete_stop(&StopId::new(id)).await?;
    state.route(ws).scheduler.trigger(Trigger::StopsChanged);
    Ok(StatusCode::NO_CONTENT)
}

async fn change_status(state: &AppState, id: String, status: StopStatus) -> Result<Json<StatusResponse>, AppError> {
    let change = state
        .store
        .set_status(&StopId::new(id), status, Utc::now())
        .await?;
    state.stops_changed(change);
    Ok(Json(change.into()))
}

/// Mark a stop delivered; it leaves the route.
async fn deliver_stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    change_status(&state, id, StopStatus::Delivered).await
}

/// Report a problem; the stop moves to the reported set.
async fn report_stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::BadRequest {
            message: "a report needs a reason".to_string(),
        });
    }
    change_status(&state, id, StopStatus::Reported { reason }).await
}

/// Put a reported stop back on today's route.
async fn restore_stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    change_status(&state, id, StopStatus::Pending).await
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl From<UnknownWorkingSet> for AppError {
    fn from(e: UnknownWorkingSet) -> Self {
        AppError::NotFound {
            message: e.to_string(),
        }
    }
}

impl From<InvalidCoordinates> for AppError {
    fn from(e: InvalidCoordinates) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
            StoreError::Duplicate(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            StoreError::Timeout(_) => AppError::Unavailable {
                message: e.to_string(),
            },
            StoreError::Io { .. } => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<PositionError> for AppError {
    fn from(e: PositionError) -> Self {
        match e {
            PositionError::Unavailable { .. } => AppError::Unavailable {
                message: e.to_string(),
            },
            PositionError::Persist(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::store::InMemoryStore;

    fn app() -> (Router, AppState) {
        let state = AppState::new(InMemoryStore::new(), &AppConfig::default());
        (create_router(state.clone()), state)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn add_stop(router: &Router, id: &str, coordinates: Option<(f64, f64)>) {
        let body = match coordinates {
            Some((lat, lng)) => json!({"id": id, "name": id, "coordinates": {"lat": lat, "lng": lng}}),
            None => json!({"id": id, "name": id}),
        };
        let (status, _) = send(router, Method::POST, "/api/stops", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn health_check() {
        let (router, _) = app();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_working_set_is_not_found() {
        let (router, _) = app();
        let (status, body) = send(&router, Method::GET, "/api/routes/tomorrow", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown working set: tomorrow");
    }

    #[tokio::test(start_paused = true)]
    async fn route_is_ordered_after_changes() {
        let (router, state) = app();
        let scheduler = &state.route(WorkingSet::Today).scheduler;
        let task = scheduler.spawn();

        add_stop(&router, "far", Some((16.95, 99.20))).await;
        add_stop(&router, "none", None).await;
        add_stop(&router, "near", Some((16.8834, 99.1250))).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let (status, body) = send(&router, Method::GET, "/api/routes/today", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"]["state"], "uninitialized");

        let stops = body["route"]["route"]["stops"].as_array().unwrap();
        let ids: Vec<&str> = stops.iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["near", "far", "none"]);
        assert_eq!(stops[2]["order_index"], 3);
        assert!(stops[2]["distance_km"].is_null());
        assert!(body["error"].is_null());

        task.abort();
    }

    #[tokio::test]
    async fn fixed_origin_round_trip() {
        let (router, _) = app();

        let (status, body) = send(
            &router,
            Method::PUT,
            "/api/routes/reported/origin",
            Some(json!({"lat": 16.88, "lng": 99.12, "name": "Depot"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "fixed");
        assert_eq!(body["name"], "Depot");

        let (_, body) = send(&router, Method::GET, "/api/routes/reported/origin", None).await;
        assert_eq!(body["point"]["lat"], 16.88);

        // The other working set is independent.
        let (_, body) = send(&router, Method::GET, "/api/routes/today/origin", None).await;
        assert_eq!(body["state"], "uninitialized");
    }

    #[tokio::test]
    async fn out_of_range_origin_rejected() {
        let (router, _) = app();
        let (status, _) = send(
            &router,
            Method::PUT,
            "/api/routes/today/origin",
            Some(json!({"lat": 91.0, "lng": 0.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn position_push_validates() {
        let (router, state) = app();

        let (status, _) = send(
            &router,
            Method::POST,
            "/api/routes/today/position",
            Some(json!({"lat": 16.9, "lng": 99.1})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &router,
            Method::POST,
            "/api/routes/today/position",
            Some(json!({"lat": 0.0, "lng": 200.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // The pushed fix answers a one-shot detection.
        let point = state.route(WorkingSet::Today).provider.detect().await.unwrap();
        assert_eq!(point, Coordinates::new(16.9, 99.1).unwrap());
    }

    #[tokio::test]
    async fn cluster_toggle() {
        let (router, state) = app();
        let (status, body) = send(
            &router,
            Method::PUT,
            "/api/routes/today/cluster",
            Some(json!({"enabled": true})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enabled"], true);
        assert!(state.route(WorkingSet::Today).scheduler.cluster_nearby());
        assert!(!state.route(WorkingSet::Reported).scheduler.cluster_nearby());
    }

    #[tokio::test]
    async fn report_and_restore_move_stop() {
        let (router, state) = app();
        add_stop(&router, "a", Some((16.9, 99.1))).await;

        let (status, _) = send(&router, Method::POST, "/api/stops/a/report", Some(json!({"reason": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/stops/a/report",
            Some(json!({"reason": "nobody home"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "today");
        assert_eq!(body["to"], "reported");
        assert!(state.route(WorkingSet::Reported).scheduler.needs_reorder());

        let (_, body) = send(&router, Method::POST, "/api/stops/a/restore", None).await;
        assert_eq!(body["to"], "today");

        let (_, body) = send(&router, Method::POST, "/api/stops/a/deliver", None).await;
        assert!(body["to"].is_null());
        assert_eq!(state.store.delivered().await.len(), 1);
    }

    #[tokio::test]
    async fn stop_errors() {
        let (router, _) = app();
        add_stop(&router, "a", None).await;

        let (status, _) = send(&router, Method::POST, "/api/stops", Some(json!({"id": "a", "name": "again"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            Method::POST,
            "/api/stops",
            Some(json!({"id": "b", "name": "b", "coordinates": {"lat": -95.0, "lng": 0.0}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, Method::DELETE, "/api/stops/a", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&router, Method::DELETE, "/api/stops/a", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::POST, "/api/stops/zz/deliver", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn error_response_format() {
        let response = AppError::Unavailable {
            message: "no fix".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "no fix"}));
    }
}
