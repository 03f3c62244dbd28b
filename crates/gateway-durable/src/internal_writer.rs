// Internal Audit Writer (C8): writes audit events directly to the row
// store, bypassing the HTTP surface entirely so the service's own audit
// emission never recurses into itself. Grounded in
// control-plane::storage::event_emitter::DbEventEmitter, which wraps a
// `Database` and implements the shared sink trait directly against it.

use std::time::Instant;

use async_trait::async_trait;
use gateway_core::domain::AuditEvent;
use gateway_core::traits::{AuditSink, SubmitOutcome};
use gateway_storage::models::CreateAuditEventRow;
use gateway_storage::Database;

#[derive(Clone)]
pub struct InternalAuditWriter {
    db: Database,
}

impl InternalAuditWriter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn write(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let started = Instant::now();
        let result = self
            .db
            .insert_audit_event(CreateAuditEventRow {
                event_id: event.event_id,
                schema_version: event.schema_version.clone(),
                event_timestamp: event.timestamp,
                event_type: event.event_type.clone(),
                event_category: event.event_category.clone(),
                event_outcome: event.event_outcome.clone(),
                actor_type: event.actor_type.clone(),
                actor_id: event.actor_id.clone(),
                resource_type: event.resource_type.clone(),
                resource_id: event.resource_id.clone(),
                correlation_id: event.correlation_id,
                event_data: event.event_data.clone(),
                retention_days: event.retention_days,
                sensitive: event.sensitive,
            })
            .await;
        metrics::histogram!("audit_write_duration_seconds").record(started.elapsed().as_secs_f64());
        result?;
        Ok(())
    }
}

/// Allows the internal writer to stand in directly as an `AuditSink` in
/// deployments that opt out of the buffered path (e.g. tests).
#[async_trait]
impl AuditSink for InternalAuditWriter {
    async fn submit(&self, event: AuditEvent) -> SubmitOutcome {
        match self.write(&event).await {
            Ok(()) => SubmitOutcome::Ok,
            Err(e) => {
                tracing::error!(error = %e, event_id = %event.event_id, "internal audit write failed");
                SubmitOutcome::Full
            }
        }
    }
}
