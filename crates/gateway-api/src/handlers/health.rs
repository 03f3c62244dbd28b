// GET /healthz, /readyz, /metrics (§6.5, C13). Liveness never reflects
// shutdown state; readiness flips the instant DRAINING begins.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;

use crate::state::AppState;

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Process is alive")), tag = "health")]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready to serve traffic"),
        (status = 503, description = "Schema probe failed or shutdown in progress"),
    ),
    tag = "health",
)]
pub async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_handle.render()
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(healthz))
        .route("/readyz", axum::routing::get(readyz))
        .route("/metrics", axum::routing::get(metrics))
        .with_state(state)
}
