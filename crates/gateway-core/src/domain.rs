// Domain entities shared across the gateway's crates. These are runtime
// types, independent of how any particular crate persists them — the
// storage crate owns the `FromRow` row structs and converts to/from these.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Bounded label map: at most `MAX_LABEL_ENTRIES` (see `validation`) keys.
pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
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

impl AuditEvent {
    pub fn service_generated(
        event_type: impl Into<String>,
        event_category: impl Into<String>,
        event_outcome: impl Into<String>,
        correlation_id: Uuid,
        event_data: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            schema_version: "1.0".to_string(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            event_category: event_category.into(),
            event_outcome: event_outcome.into(),
            actor_type: "service".to_string(),
            actor_id: "gateway".to_string(),
            resource_type: String::new(),
            resource_id: String::new(),
            correlation_id,
            event_data,
            retention_days: 90,
            sensitive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RemediationWorkflow {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub description: String,
    pub container_image: String,
    pub spec: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub labels: Labels,
    pub is_enabled: bool,
    pub is_latest_version: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PlaybookExecutionTrace {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub id: Uuid,
    pub payload_kind: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub surfaced: bool,
}

/// The outcome classification for a dual-write (C5 contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Atomic,
    Degraded,
    Dlq,
}

impl WriteMode {
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            WriteMode::Atomic => None,
            WriteMode::Degraded => Some("degraded"),
            WriteMode::Dlq => Some("dlq"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub id: Uuid,
    pub primary_ok: bool,
    pub vector_ok: bool,
    pub mode: WriteMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_mode_header_values() {
        assert_eq!(WriteMode::Atomic.header_value(), None);
        assert_eq!(WriteMode::Degraded.header_value(), Some("degraded"));
        assert_eq!(WriteMode::Dlq.header_value(), Some("dlq"));
    }

    #[test]
    fn service_generated_audit_event_has_fresh_id_and_version() {
        let correlation_id = Uuid::now_v7();
        let event = AuditEvent::service_generated(
            "workflow.catalog.search_completed",
            "workflow",
            "success",
            correlation_id,
            serde_json::json!({}),
        );
        assert_eq!(event.schema_version, "1.0");
        assert_eq!(event.correlation_id, correlation_id);
        assert_ne!(event.event_id, Uuid::nil());
    }
}
