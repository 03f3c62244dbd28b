// GET /api/v1/incidents/aggregate/... — dimensioned success-rate rollups
// (§6.3) plus the deprecated legacy endpoint kept addressable for backward
// compatibility.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::{Json, Router};
use gateway_aggregation::AggregationResponse;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Samples below this count yield `confidence: "low"` unless the caller
/// overrides via `min_samples`.
const DEFAULT_MIN_SAMPLES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ByIncidentTypeQuery {
    pub incident_type: String,
    pub time_range: String,
    pub min_samples: Option<i64>,
}

async fn by_incident_type(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ByIncidentTypeQuery>,
) -> Result<Json<AggregationResponse>, ApiError> {
    let started = Instant::now();
    let response = state
        .aggregation
        .by_incident_type(
            &query.incident_type,
            &query.time_range,
            query.min_samples.unwrap_or(DEFAULT_MIN_SAMPLES),
        )
        .await?;
    metrics::histogram!("query_duration_seconds", "operation" => "by_incident_type")
        .record(started.elapsed().as_secs_f64());
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ByPlaybookQuery {
    pub playbook_id: String,
    pub playbook_version: Option<String>,
    pub time_range: String,
    pub min_samples: Option<i64>,
}

async fn by_playbook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ByPlaybookQuery>,
) -> Result<Json<AggregationResponse>, ApiError> {
    let started = Instant::now();
    let response = state
        .aggregation
        .by_playbook(
            &query.playbook_id,
            query.playbook_version.as_deref(),
            &query.time_range,
            query.min_samples.unwrap_or(DEFAULT_MIN_SAMPLES),
        )
        .await?;
    metrics::histogram!("query_duration_seconds", "operation" => "by_playbook")
        .record(started.elapsed().as_secs_f64());
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct MultiDimensionalQuery {
    pub incident_type: Option<String>,
    pub playbook_id: Option<String>,
    pub action_type: Option<String>,
    pub time_range: String,
}

async fn multi_dimensional(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MultiDimensionalQuery>,
) -> Result<Json<AggregationResponse>, ApiError> {
    let started = Instant::now();
    let response = state
        .aggregation
        .multi_dimensional(
            query.incident_type.as_deref(),
            query.playbook_id.as_deref(),
            query.action_type.as_deref(),
            &query.time_range,
        )
        .await?;
    metrics::histogram!("query_duration_seconds", "operation" => "multi_dimensional")
        .record(started.elapsed().as_secs_f64());
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct LegacySuccessRateQuery {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default = "default_time_range")]
    pub time_range: String,
}

fn default_time_range() -> String {
    "7d".to_string()
}

async fn legacy_success_rate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LegacySuccessRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let _ = query.workflow_id; // retained for signature compatibility only, never filters on it
    let started = Instant::now();
    let response = state
        .aggregation
        .multi_dimensional(None, None, None, &query.time_range)
        .await?;
    metrics::histogram!("query_duration_seconds", "operation" => "legacy_success_rate")
        .record(started.elapsed().as_secs_f64());

    let mut http_response = Json(response).into_response();
    http_response.headers_mut().insert(
        "Warning",
        HeaderValue::from_static(
            "299 - \"workflow_id deprecated; use /by-incident-type or /by-playbook\"",
        ),
    );
    Ok(http_response)
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/incidents/aggregate/success-rate/by-incident-type",
            axum::routing::get(by_incident_type),
        )
        .route(
            "/api/v1/incidents/aggregate/success-rate/by-playbook",
            axum::routing::get(by_playbook),
        )
        .route(
            "/api/v1/incidents/aggregate/success-rate/multi-dimensional",
            axum::routing::get(multi_dimensional),
        )
        .route(
            "/api/v1/incidents/aggregate/success-rate",
            axum::routing::get(legacy_success_rate),
        )
        .with_state(state)
}
