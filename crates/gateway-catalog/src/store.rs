// Workflow Catalog Store (C9): create/get/update/disable against the row
// store, with embedding-on-create pushed through the vector store. The
// uniqueness-check-then-insert shape and the "update only touches status
// fields" pattern are grounded in everruns-storage::repositories::Database
// (COALESCE-based partial update, never accepting the immutable columns).

use std::sync::Arc;
use std::time::Instant;

use gateway_core::domain::{Labels, RemediationWorkflow, WriteMode};
use gateway_core::traits::{EmbeddingProvider, VectorStore};
use gateway_core::{GatewayError, Result};
use gateway_storage::models::{CreateWorkflowRow, RemediationWorkflowRow, UpdateWorkflowRow};
use gateway_storage::Database;
use uuid::Uuid;

const WORKFLOWS_TABLE: &str = "remediation_workflows";

pub struct CreateWorkflowInput {
    pub name: String,
    pub version: String,
    pub description: String,
    pub container_image: String,
    pub spec: serde_json::Value,
    pub labels: Labels,
}

/// Only the fields a caller may ever mutate post-creation. There is
/// deliberately no `spec` or `container_image` field here: the
/// immutability invariant is enforced by this type never being able to
/// carry those values through to the storage layer, not by a runtime check.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStatusPatch {
    pub is_enabled: Option<bool>,
}

pub struct CatalogStore {
    db: Database,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
}

impl CatalogStore {
    pub fn new(db: Database, embeddings: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorStore>) -> Self {
        Self {
            db,
            embeddings,
            vectors,
        }
    }

    /// Returns the created workflow alongside the write mode the vector
    /// upsert actually achieved; a degraded vector write is not a failed
    /// request, so the caller's resource (and its id) must still come
    /// back even when `mode` is `WriteMode::Degraded`.
    pub async fn create(&self, input: CreateWorkflowInput) -> Result<(RemediationWorkflow, WriteMode)> {
        let write_started = Instant::now();
        let record_write = |status: &'static str| {
            metrics::counter!("write_total", "table" => WORKFLOWS_TABLE, "status" => status)
                .increment(1);
            metrics::histogram!("write_duration_seconds", "table" => WORKFLOWS_TABLE)
                .record(write_started.elapsed().as_secs_f64());
        };

        if self
            .db
            .workflow_name_version_exists(&input.name, &input.version)
            .await
            .map_err(GatewayError::Internal)?
        {
            record_write("conflict");
            return Err(GatewayError::conflict(format!(
                "workflow {}@{} already exists",
                input.name, input.version
            )));
        }

        let id = Uuid::now_v7();
        let embedding = self
            .embeddings
            .embed(&input.description)
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let labels_json = serde_json::to_value(&input.labels).unwrap_or(serde_json::json!({}));

        let row = self
            .db
            .insert_workflow(CreateWorkflowRow {
                id,
                name: input.name,
                version: input.version,
                description: input.description,
                container_image: input.container_image,
                spec: input.spec,
                labels: labels_json,
            })
            .await
            .map_err(GatewayError::Internal)?;

        let mode = match self.vectors.upsert(id, &embedding).await {
            Ok(()) => WriteMode::Atomic,
            Err(e) => {
                tracing::warn!(error = %e, workflow_id = %id, "vector upsert failed, workflow row committed anyway");
                metrics::counter!("dualwrite_failure_total", "reason" => "vector_store").increment(1);
                metrics::counter!("fallback_mode_total").increment(1);
                WriteMode::Degraded
            }
        };
        record_write(if mode == WriteMode::Degraded { "degraded" } else { "atomic" });

        Ok((to_domain(row, Some(embedding)), mode))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<RemediationWorkflow> {
        let row = self
            .db
            .get_workflow(id)
            .await
            .map_err(GatewayError::Internal)?
            .ok_or_else(|| GatewayError::not_found("workflow", id))?;
        Ok(to_domain(row, None))
    }

    pub async fn update_status(&self, id: Uuid, patch: WorkflowStatusPatch) -> Result<RemediationWorkflow> {
        let row = self
            .db
            .update_workflow_status(
                id,
                UpdateWorkflowRow {
                    is_enabled: patch.is_enabled,
                    is_latest_version: None,
                },
            )
            .await
            .map_err(GatewayError::Internal)?
            .ok_or_else(|| GatewayError::not_found("workflow", id))?;
        Ok(to_domain(row, None))
    }

    pub async fn disable(&self, id: Uuid) -> Result<RemediationWorkflow> {
        let row = self
            .db
            .disable_workflow(id)
            .await
            .map_err(GatewayError::Internal)?
            .ok_or_else(|| GatewayError::not_found("workflow", id))?;
        Ok(to_domain(row, None))
    }
}

fn to_domain(row: RemediationWorkflowRow, embedding: Option<Vec<f32>>) -> RemediationWorkflow {
    let labels: Labels = serde_json::from_value(row.labels).unwrap_or_default();
    RemediationWorkflow {
        id: row.id,
        name: row.name,
        version: row.version,
        description: row.description,
        container_image: row.container_image,
        spec: row.spec,
        embedding,
        labels,
        is_enabled: row.is_enabled,
        is_latest_version: row.is_latest_version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_patch_never_exposes_spec_or_container_image() {
        // Compile-time guarantee: if this type grows those fields the
        // immutability invariant in the storage layer is bypassed.
        let patch = WorkflowStatusPatch { is_enabled: Some(false) };
        assert_eq!(patch.is_enabled, Some(false));
    }
}
