// POST /api/v1/audit/events — generic audit write (§6.1). Submission goes
// through the buffered sink (C7); a full buffer spills synchronously to the
// DLQ and the caller learns via the 202 + X-Write-Mode: dlq response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use gateway_core::domain::AuditEvent;
use gateway_core::traits::SubmitOutcome;
use gateway_core::validation::{Validator, EVENT_CATEGORY_VALUES, EVENT_OUTCOME_VALUES, MAX_FREE_TEXT_BYTES, MAX_NAME_BYTES};
use gateway_core::GatewayError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::correlation;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAuditEventRequest {
    pub event_type: String,
    pub event_category: String,
    pub event_outcome: String,
    #[serde(default = "default_actor_type")]
    pub actor_type: String,
    pub actor_id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
    #[serde(default = "default_retention_days")]
    pub retention_days: i32,
    #[serde(default)]
    pub sensitive: bool,
}

fn default_actor_type() -> String {
    "user".to_string()
}

fn default_retention_days() -> i32 {
    90
}

#[derive(Debug, Serialize)]
pub struct AuditEventResponse {
    pub event_id: Uuid,
    pub correlation_id: Uuid,
}

fn validate(request: &CreateAuditEventRequest) -> Result<(), GatewayError> {
    let mut v = Validator::new();
    v.require_non_empty("event_type", &request.event_type)
        .bounded_length("event_type", &request.event_type, MAX_NAME_BYTES)
        .closed_enum("event_category", &request.event_category, EVENT_CATEGORY_VALUES)
        .closed_enum("event_outcome", &request.event_outcome, EVENT_OUTCOME_VALUES)
        .require_non_empty("actor_id", &request.actor_id)
        .bounded_length("actor_id", &request.actor_id, MAX_NAME_BYTES);
    if let Some(text) = request.event_data.as_str() {
        v.bounded_length("event_data", text, MAX_FREE_TEXT_BYTES)
            .sanitized_text("event_data", text);
    }
    v.finish().map_err(GatewayError::validation)
}

async fn create_audit_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAuditEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&request)?;

    let correlation_id = correlation::from_headers(&headers);
    let event = AuditEvent {
        event_id: Uuid::now_v7(),
        schema_version: "1.0".to_string(),
        timestamp: chrono::Utc::now(),
        event_type: request.event_type,
        event_category: request.event_category,
        event_outcome: request.event_outcome,
        actor_type: request.actor_type,
        actor_id: request.actor_id,
        resource_type: request.resource_type,
        resource_id: request.resource_id,
        correlation_id,
        event_data: request.event_data,
        retention_days: request.retention_days,
        sensitive: request.sensitive,
    };

    let outcome = state.audit.submit(event.clone()).await;
    let body = AuditEventResponse {
        event_id: event.event_id,
        correlation_id,
    };

    Ok(match outcome {
        SubmitOutcome::Ok => (StatusCode::CREATED, Json(body)).into_response(),
        SubmitOutcome::Full => {
            let mut response = (StatusCode::ACCEPTED, Json(body)).into_response();
            crate::error::apply_write_mode_header(&mut response, gateway_core::WriteMode::Dlq);
            response
        }
    })
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/audit/events", axum::routing::post(create_audit_event))
        .with_state(state)
}
