// Concrete `DlqReplayer` (C6) for this gateway's two spilled payload kinds:
// playbook execution traces that never committed to the row store, and
// audit events that never made it past a full buffer. Unknown payload
// kinds are left for operator inspection rather than silently dropped.

use gateway_core::domain::AuditEvent;
use gateway_storage::models::CreateTraceRow;
use gateway_storage::Database;

use crate::dlq::DlqReplayer;
use crate::internal_writer::InternalAuditWriter;

pub struct GatewayDlqReplayer {
    db: Database,
    writer: InternalAuditWriter,
}

impl GatewayDlqReplayer {
    pub fn new(db: Database, writer: InternalAuditWriter) -> Self {
        Self { db, writer }
    }
}

#[async_trait::async_trait]
impl DlqReplayer for GatewayDlqReplayer {
    async fn replay(&self, payload_kind: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        match payload_kind {
            "playbook_execution_trace" => {
                let row: CreateTraceRow = serde_json::from_value(payload.clone())?;
                self.db.insert_trace(row).await?;
                Ok(())
            }
            "audit_event" => {
                let event: AuditEvent = serde_json::from_value(payload.clone())?;
                self.writer.write(&event).await
            }
            other => anyhow::bail!("no replay handler registered for payload kind {other}"),
        }
    }
}
