// Database row shapes (internal, may differ from the public domain types
// in gateway-core). Grounded in everruns-storage's models.rs: a `FromRow`
// row struct per table plus paired `CreateX`/`UpdateX` input structs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct AuditEventRow {
    pub event_id: Uuid,
    pub schema_version: String,
    pub event_timestamp: DateTime<Utc>,
    pub event_type: String,
    pub event_category: String,
    pub event_outcome: String,
    pub actor_type: String,
    pub actor_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub correlation_id: Uuid,
    pub event_data: serde_json::Value,
    pub retention_days: i32,
    pub sensitive: bool,
}

#[derive(Debug, Clone)]
pub struct CreateAuditEventRow {
    pub event_id: Uuid,
    pub schema_version: String,
    pub event_timestamp: DateTime<Utc>,
    pub event_type: String,
    pub event_category: String,
    pub event_outcome: String,
    pub actor_type: String,
    pub actor_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub correlation_id: Uuid,
    pub event_data: serde_json::Value,
    pub retention_days: i32,
    pub sensitive: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct RemediationWorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub description: String,
    pub container_image: String,
    pub spec: serde_json::Value,
    pub labels: serde_json::Value,
    pub is_enabled: bool,
    pub is_latest_version: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub description: String,
    pub container_image: String,
    pub spec: serde_json::Value,
    pub labels: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateWorkflowRow {
    pub is_enabled: Option<bool>,
    pub is_latest_version: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaybookExecutionTraceRow {
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

/// `Deserialize` is used only to reconstruct a DLQ-spilled payload during
/// replay (see gateway-durable::replay); the dual-write coordinator never
/// deserializes one.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTraceRow {
    pub id: Uuid,
    pub incident_type: String,
    pub playbook_id: String,
    pub playbook_version: String,
    pub action_type: String,
    pub step_number: i32,
    pub status: String,
    pub confidence: Option<f64>,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct DlqEntryRow {
    pub id: Uuid,
    pub payload_kind: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub surfaced: bool,
}

#[derive(Debug, Clone)]
pub struct CreateDlqEntryRow {
    pub id: Uuid,
    pub payload_kind: String,
    pub payload: serde_json::Value,
}

/// Rollup row returned by the aggregation queries in gateway-aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct AggregationRow {
    pub dimension_value: String,
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}
