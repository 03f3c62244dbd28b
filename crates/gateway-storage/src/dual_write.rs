// Dual-Write Coordinator (C5): atomic-or-degraded write across the
// row store (C3) and the vector store (C4), with a dead-letter fallback
// on primary-store failure. Grounded in the transaction-holding-open
// pattern used by everruns-storage::repositories::set_agent_capabilities
// (`pool.begin()` -> mutate via `&mut *tx` -> `tx.commit()`), extended
// with the embedding call and vector insert the spec requires in between.

use std::sync::Arc;
use std::time::Instant;

use gateway_core::traits::{EmbeddingProvider, VectorStore};
use gateway_core::{GatewayError, Result, WriteMode, WriteResult};
use metrics::{counter, histogram};
use uuid::Uuid;

use crate::database::Database;
use crate::models::{CreateDlqEntryRow, CreateTraceRow};

const TRACES_TABLE: &str = "playbook_execution_traces";

pub struct DualWriteCoordinator {
    db: Database,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
}

impl DualWriteCoordinator {
    pub fn new(
        db: Database,
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            db,
            embeddings,
            vectors,
        }
    }

    /// Writes a playbook execution trace (`POST /api/v1/incidents/actions`).
    ///
    /// `embedding_text` is the text derived from the trace used to produce
    /// its vector (e.g. `"{incident_type} {action_type}"`); passing `None`
    /// skips the vector write entirely and the call always returns
    /// `WriteMode::Atomic` once the row commits.
    pub async fn write_trace(
        &self,
        input: CreateTraceRow,
        embedding_text: Option<String>,
    ) -> Result<WriteResult> {
        let id = input.id;
        let write_started = Instant::now();
        let record_write = |status: &'static str| {
            counter!("write_total", "table" => TRACES_TABLE, "status" => status).increment(1);
            histogram!("write_duration_seconds", "table" => TRACES_TABLE)
                .record(write_started.elapsed().as_secs_f64());
        };

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO playbook_execution_traces (
                id, incident_type, playbook_id, playbook_version, action_type,
                step_number, status, confidence, correlation_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(input.id)
        .bind(&input.incident_type)
        .bind(&input.playbook_id)
        .bind(&input.playbook_version)
        .bind(&input.action_type)
        .bind(input.step_number)
        .bind(&input.status)
        .bind(input.confidence)
        .bind(input.correlation_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;

        let mut mode = WriteMode::Atomic;
        let mut vector_ok = false;

        if let Some(text) = embedding_text {
            match self.embeddings.embed(&text).await {
                Ok(vector) => match self.vectors.upsert(id, &vector).await {
                    Ok(()) => vector_ok = true,
                    Err(e) => {
                        tracing::warn!(error = %e, trace_id = %id, "vector store upsert failed, committing row anyway");
                        counter!("dualwrite_failure_total", "reason" => "vector_store").increment(1);
                        mode = WriteMode::Degraded;
                    }
                },
                Err(e) if e.retryable() => {
                    tracing::warn!(error = %e, trace_id = %id, "embedding call failed retryably, proceeding without vector");
                    counter!("dualwrite_failure_total", "reason" => "embedding_retryable").increment(1);
                    mode = WriteMode::Degraded;
                }
                Err(e) => {
                    tx.rollback().await.ok();
                    counter!("dualwrite_failure_total", "reason" => "embedding_fatal").increment(1);
                    record_write("embedding_fatal");
                    return Err(GatewayError::unavailable(format!(
                        "embedding required for this write failed: {e}"
                    )));
                }
            }
        }

        match tx.commit().await {
            Ok(()) => {
                counter!("dualwrite_success_total").increment(1);
                if mode == WriteMode::Degraded {
                    counter!("fallback_mode_total").increment(1);
                }
                record_write(if mode == WriteMode::Degraded {
                    "degraded"
                } else {
                    "atomic"
                });
                Ok(WriteResult {
                    id,
                    primary_ok: true,
                    vector_ok,
                    mode,
                })
            }
            Err(commit_err) => {
                tracing::error!(error = %commit_err, trace_id = %id, "primary store commit failed, spilling to dlq");
                counter!("dualwrite_failure_total", "reason" => "primary_store").increment(1);

                let payload = serde_json::json!({
                    "id": input.id,
                    "incident_type": input.incident_type,
                    "playbook_id": input.playbook_id,
                    "playbook_version": input.playbook_version,
                    "action_type": input.action_type,
                    "step_number": input.step_number,
                    "status": input.status,
                    "confidence": input.confidence,
                    "correlation_id": input.correlation_id,
                });

                self.db
                    .enqueue_dlq(CreateDlqEntryRow {
                        id: Uuid::now_v7(),
                        payload_kind: "playbook_execution_trace".to_string(),
                        payload,
                    })
                    .await
                    .map_err(GatewayError::Internal)?;

                counter!("dlq_enqueued_total").increment(1);
                record_write("dlq");

                Ok(WriteResult {
                    id,
                    primary_ok: false,
                    vector_ok: false,
                    mode: WriteMode::Dlq,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_mode_has_header_but_dlq_mode_too() {
        assert_eq!(WriteMode::Atomic.header_value(), None);
        assert_eq!(WriteMode::Degraded.header_value(), Some("degraded"));
        assert_eq!(WriteMode::Dlq.header_value(), Some("dlq"));
    }
}
