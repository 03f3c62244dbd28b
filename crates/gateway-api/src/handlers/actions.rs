// POST/GET /api/v1/incidents/actions(/{id}) — playbook execution trace
// write and query paths (§6.1, §6.2). Writes go through the Dual-Write
// Coordinator (C5); the embedding text mirrors the pairing the coordinator
// doc comment calls out: "{incident_type} {action_type}".

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use gateway_core::validation::{Validator, ACTION_STATUS_VALUES, MAX_NAME_BYTES};
use gateway_core::{GatewayError, WriteMode};
use gateway_storage::models::CreateTraceRow;
use gateway_storage::TraceFilter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::correlation;
use crate::error::{apply_write_mode_header, ApiError};
use crate::pagination::PageParams;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateActionRequest {
    pub incident_type: String,
    pub playbook_id: String,
    pub playbook_version: String,
    pub action_type: String,
    pub step_number: i32,
    pub status: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CreateActionResponse {
    pub id: Uuid,
}

fn validate_create(request: &CreateActionRequest) -> Result<(), GatewayError> {
    let mut v = Validator::new();
    v.require_non_empty("incident_type", &request.incident_type)
        .bounded_length("incident_type", &request.incident_type, MAX_NAME_BYTES)
        .require_non_empty("playbook_id", &request.playbook_id)
        .bounded_length("playbook_id", &request.playbook_id, MAX_NAME_BYTES)
        .require_non_empty("playbook_version", &request.playbook_version)
        .require_non_empty("action_type", &request.action_type)
        .bounded_length("action_type", &request.action_type, MAX_NAME_BYTES)
        .closed_enum("status", &request.status, ACTION_STATUS_VALUES);
    v.finish().map_err(GatewayError::validation)
}

async fn create_action(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(request): Json<CreateActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_create(&request)?;

    let correlation_id = correlation::from_headers(&headers);
    tracing::info!(principal = %auth.principal_id, incident_type = %request.incident_type, "recording playbook execution trace");
    let embedding_text = format!("{} {}", request.incident_type, request.action_type);

    let result = state
        .dual_write
        .write_trace(
            CreateTraceRow {
                id: Uuid::now_v7(),
                incident_type: request.incident_type,
                playbook_id: request.playbook_id,
                playbook_version: request.playbook_version,
                action_type: request.action_type,
                step_number: request.step_number,
                status: request.status,
                confidence: request.confidence,
                correlation_id,
            },
            Some(embedding_text),
        )
        .await?;

    let status = if result.mode == WriteMode::Dlq {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CREATED
    };

    let mut response = (status, Json(CreateActionResponse { id: result.id })).into_response();
    apply_write_mode_header(&mut response, result.mode);
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ListActionsQuery {
    pub incident_type: Option<String>,
    pub status: Option<String>,
    pub action_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub page: PageParams,
}

#[derive(Debug, Serialize)]
pub struct TraceResponse {
    pub id: Uuid,
    pub incident_type: String,
    pub playbook_id: String,
    pub playbook_version: String,
    pub action_type: String,
    pub step_number: i32,
    pub status: String,
    pub confidence: Option<f64>,
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

async fn list_actions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListActionsQuery>,
) -> Result<Json<Vec<TraceResponse>>, ApiError> {
    query.page.validate()?;

    let started = Instant::now();
    let rows = state
        .db
        .list_traces(TraceFilter {
            incident_type: query.incident_type,
            status: query.status,
            action_type: query.action_type,
            since: query.since,
            limit: query.page.limit,
            offset: query.page.offset,
        })
        .await
        .map_err(GatewayError::Internal)?;
    metrics::histogram!("query_duration_seconds", "operation" => "list_actions")
        .record(started.elapsed().as_secs_f64());

    Ok(Json(
        rows.into_iter()
            .map(|r| TraceResponse {
                id: r.id,
                incident_type: r.incident_type,
                playbook_id: r.playbook_id,
                playbook_version: r.playbook_version,
                action_type: r.action_type,
                step_number: r.step_number,
                status: r.status,
                confidence: r.confidence,
                correlation_id: r.correlation_id,
                created_at: r.created_at,
            })
            .collect(),
    ))
}

async fn get_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TraceResponse>, ApiError> {
    let started = Instant::now();
    let row = state
        .db
        .get_trace(id)
        .await
        .map_err(GatewayError::Internal)?
        .ok_or_else(|| GatewayError::not_found("playbook_execution_trace", id))?;
    metrics::histogram!("query_duration_seconds", "operation" => "get_action")
        .record(started.elapsed().as_secs_f64());

    Ok(Json(TraceResponse {
        id: row.id,
        incident_type: row.incident_type,
        playbook_id: row.playbook_id,
        playbook_version: row.playbook_version,
        action_type: row.action_type,
        step_number: row.step_number,
        status: row.status,
        confidence: row.confidence,
        correlation_id: row.correlation_id,
        created_at: row.created_at,
    }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/incidents/actions",
            axum::routing::post(create_action).get(list_actions),
        )
        .route("/api/v1/incidents/actions/:id", axum::routing::get(get_action))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateActionRequest {
        CreateActionRequest {
            incident_type: "pod-oom-killer".to_string(),
            playbook_id: "pod-oom-recovery".to_string(),
            playbook_version: "v1.2".to_string(),
            action_type: "increase_memory".to_string(),
            step_number: 1,
            status: "completed".to_string(),
            confidence: Some(0.9),
        }
    }

    #[test]
    fn accepts_canonical_statuses() {
        for status in ["completed", "failed", "in_progress", "skipped"] {
            let mut request = base_request();
            request.status = status.to_string();
            assert!(validate_create(&request).is_ok(), "status {status} should validate");
        }
    }

    #[test]
    fn rejects_non_canonical_status() {
        let mut request = base_request();
        request.status = "success".to_string();
        let err = validate_create(&request).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
