//! Staff HTTP surface for renewals.
//!
//!   GET  /renewals/health
//!   GET  /renewals/expiring?days=<int>
//!   POST /renewals/run
//!   POST /renewals/policies/:id/notify?day=<int>
//!
//! Malformed `days`/`day` values fall back to their defaults rather than
//! failing the request. Engine calls are synchronous (SQLite), so handlers
//! run them on the blocking pool.

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use std::sync::Arc;

use crate::{
    config::RenewalConfig,
    engine::RenewalEngine,
    error::{RenewalError, RenewalResult},
    types::{PolicyId, ThresholdDay},
};

#[derive(Clone)]
pub struct AppState {
    pub engine:              Arc<RenewalEngine>,
    pub default_window_days: u32,
    pub staff_token:         Option<Arc<str>>,
}

impl AppState {
    pub fn new(engine: Arc<RenewalEngine>, config: &RenewalConfig) -> Self {
        Self {
            engine,
            default_window_days: config.default_window_days,
            staff_token: config.staff_token.as_deref().map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let staff = Router::new()
        .route("/renewals/expiring", get(list_expiring))
        .route("/renewals/run", post(run_sweep))
        .route("/renewals/policies/:id/notify", post(notify_policy))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff));

    Router::new()
        .route("/renewals/health", get(health))
        .merge(staff)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_expiring(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let days = parse_days(params.get("days"), state.default_window_days);
    let engine = state.engine.clone();
    match blocking(move || engine.list_expiring(days)).await {
        Ok(views) => (StatusCode::OK, Json(json!({ "data": views }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn run_sweep(State(state): State<AppState>) -> Response {
    let engine = state.engine.clone();
    match blocking(move || engine.run_sweep()).await {
        Ok(summary) => (StatusCode::OK, Json(json!({ "data": summary }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn notify_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Ok(policy_id) = id.trim().parse::<PolicyId>() else {
        return error_body(StatusCode::NOT_FOUND, format!("Policy {id} not found or not current"));
    };
    let day = parse_day(params.get("day"));
    let engine = state.engine.clone();
    match blocking(move || engine.notify_policy(policy_id, day)).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "data": { "sent": true } }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn require_staff(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.staff_token.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let authorized = presented
        .map(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false);
    if authorized {
        next.run(request).await
    } else {
        error_body(StatusCode::UNAUTHORIZED, "staff authorization required".into())
    }
}

/// `days` must be a non-negative integer; anything else means the default.
pub fn parse_days(raw: Option<&String>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(default)
}

/// A malformed `day` is treated as absent.
pub fn parse_day(raw: Option<&String>) -> Option<ThresholdDay> {
    raw.and_then(|v| v.trim().parse::<ThresholdDay>().ok())
}

async fn blocking<T, F>(f: F) -> RenewalResult<T>
where
    F: FnOnce() -> RenewalResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RenewalError::Upstream(format!("worker task failed: {e}")))?
}

fn error_response(err: RenewalError) -> Response {
    let status = match &err {
        RenewalError::NotFound { .. } => StatusCode::NOT_FOUND,
        RenewalError::Dispatch { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("renewals request failed: {err}");
    }
    error_body(status, err.to_string())
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
