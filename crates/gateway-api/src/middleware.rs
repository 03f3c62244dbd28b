// Request-tracking middleware: rejects new work once DRAINING has begun
// and holds an `InFlightGuard` for the request's lifetime so the shutdown
// coordinator's drain-wait can observe when the last request finishes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

pub async fn track_in_flight(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.readiness.is_ready() {
        return Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(Body::from("service is draining"))
            .expect("static response is well-formed");
    }

    let _guard = state.in_flight.guard();
    next.run(request).await
}
