// Row-Store Gateway (C3): parameterized reads/writes against the primary
// store, backed by a pooled sqlx connection. Grounded in
// everruns-storage/src/repositories.rs's `Database { pool: PgPool }`
// pattern: typed `query_as::<_, RowType>()` calls, `COALESCE($n, column)`
// for partial updates, and `pool.begin()` / `tx.commit()` for multi-step
// writes that must be atomic.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::models::*;

/// Minimum Postgres server version this gateway requires.
const MIN_SERVER_VERSION: i32 = 130000; // Postgres 13.0, encoded as sqlx reports it
/// Minimum pgvector extension version this gateway requires.
const MIN_PGVECTOR_VERSION: &str = "0.5.0";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to the row store")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Probes the server and pgvector extension versions at startup. If
    /// either is below the configured minimum, initialization fails and
    /// the service never reports ready (see readiness contract in C12/C13).
    pub async fn probe_schema(&self) -> Result<()> {
        let server_version: i32 = sqlx::query_scalar("SHOW server_version_num")
            .fetch_one(&self.pool)
            .await
            .context("failed to read server_version_num")?
            .parse()
            .context("server_version_num was not an integer")?;

        if server_version < MIN_SERVER_VERSION {
            anyhow::bail!(
                "row store server version {server_version} is below the minimum required {MIN_SERVER_VERSION}"
            );
        }

        let vector_version: Option<String> = sqlx::query_scalar(
            "SELECT extversion FROM pg_extension WHERE extname = 'vector'",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to probe pgvector extension version")?;

        match vector_version {
            Some(version) if version.as_str() >= MIN_PGVECTOR_VERSION => Ok(()),
            Some(version) => anyhow::bail!(
                "pgvector extension version {version} is below the minimum required {MIN_PGVECTOR_VERSION}"
            ),
            None => anyhow::bail!("pgvector extension is not installed"),
        }
    }

    // ---------------------------------------------------------------
    // Audit events
    // ---------------------------------------------------------------

    pub async fn insert_audit_event(&self, input: CreateAuditEventRow) -> Result<AuditEventRow> {
        let row = sqlx::query_as::<_, AuditEventRow>(
            r#"
            INSERT INTO audit_events (
                event_id, schema_version, event_timestamp, event_type, event_category,
                event_outcome, actor_type, actor_id, resource_type, resource_id,
                correlation_id, event_data, retention_days, sensitive
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING event_id, schema_version, event_timestamp, event_type, event_category,
                      event_outcome, actor_type, actor_id, resource_type, resource_id,
                      correlation_id, event_data, retention_days, sensitive
            "#,
        )
        .bind(input.event_id)
        .bind(input.schema_version)
        .bind(input.event_timestamp)
        .bind(input.event_type)
        .bind(input.event_category)
        .bind(input.event_outcome)
        .bind(input.actor_type)
        .bind(input.actor_id)
        .bind(input.resource_type)
        .bind(input.resource_id)
        .bind(input.correlation_id)
        .bind(input.event_data)
        .bind(input.retention_days)
        .bind(input.sensitive)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert audit event")?;

        Ok(row)
    }

    pub async fn get_audit_event(&self, id: Uuid) -> Result<Option<AuditEventRow>> {
        let row = sqlx::query_as::<_, AuditEventRow>(
            "SELECT * FROM audit_events WHERE event_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch audit event")?;
        Ok(row)
    }

    // ---------------------------------------------------------------
    // Playbook execution traces (§6.1 POST /incidents/actions, §6.2 GET)
    // ---------------------------------------------------------------

    pub async fn insert_trace(&self, input: CreateTraceRow) -> Result<PlaybookExecutionTraceRow> {
        let row = sqlx::query_as::<_, PlaybookExecutionTraceRow>(
            r#"
            INSERT INTO playbook_execution_traces (
                id, incident_type, playbook_id, playbook_version, action_type,
                step_number, status, confidence, correlation_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, incident_type, playbook_id, playbook_version, action_type,
                      step_number, status, confidence, correlation_id, created_at
            "#,
        )
        .bind(input.id)
        .bind(input.incident_type)
        .bind(input.playbook_id)
        .bind(input.playbook_version)
        .bind(input.action_type)
        .bind(input.step_number)
        .bind(input.status)
        .bind(input.confidence)
        .bind(input.correlation_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert playbook execution trace")?;
        Ok(row)
    }

    pub async fn get_trace(&self, id: Uuid) -> Result<Option<PlaybookExecutionTraceRow>> {
        let row = sqlx::query_as::<_, PlaybookExecutionTraceRow>(
            "SELECT * FROM playbook_execution_traces WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch playbook execution trace")?;
        Ok(row)
    }

    pub async fn list_traces(&self, filter: TraceFilter) -> Result<Vec<PlaybookExecutionTraceRow>> {
        let rows = sqlx::query_as::<_, PlaybookExecutionTraceRow>(
            r#"
            SELECT * FROM playbook_execution_traces
            WHERE ($1::text IS NULL OR incident_type = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR action_type = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
            ORDER BY created_at DESC, id
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.incident_type)
        .bind(filter.status)
        .bind(filter.action_type)
        .bind(filter.since)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .context("failed to list playbook execution traces")?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // Workflow catalog (C9)
    // ---------------------------------------------------------------

    /// Inserts a new workflow version and demotes the previous latest
    /// version of the same name within one transaction, so readers never
    /// observe two rows with `is_latest_version = true`.
    pub async fn insert_workflow(&self, input: CreateWorkflowRow) -> Result<RemediationWorkflowRow> {
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;

        sqlx::query(
            "UPDATE remediation_workflows SET is_latest_version = false WHERE name = $1 AND is_latest_version = true",
        )
        .bind(&input.name)
        .execute(&mut *tx)
        .await
        .context("failed to demote previous latest workflow version")?;

        let row = sqlx::query_as::<_, RemediationWorkflowRow>(
            r#"
            INSERT INTO remediation_workflows (
                id, name, version, description, container_image, spec, labels,
                is_enabled, is_latest_version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, true, true)
            RETURNING id, name, version, description, container_image, spec, labels,
                      is_enabled, is_latest_version, created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(input.name)
        .bind(input.version)
        .bind(input.description)
        .bind(input.container_image)
        .bind(input.spec)
        .bind(input.labels)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert workflow")?;

        tx.commit().await.context("failed to commit workflow insert")?;
        Ok(row)
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<RemediationWorkflowRow>> {
        let row = sqlx::query_as::<_, RemediationWorkflowRow>(
            "SELECT * FROM remediation_workflows WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch workflow")?;
        Ok(row)
    }

    /// Only status fields mutate here; `spec`/`container_image` are never
    /// accepted by this method — immutability is enforced at the
    /// validation layer, which never constructs an `UpdateWorkflowRow`
    /// carrying those fields in the first place.
    pub async fn update_workflow_status(
        &self,
        id: Uuid,
        patch: UpdateWorkflowRow,
    ) -> Result<Option<RemediationWorkflowRow>> {
        let row = sqlx::query_as::<_, RemediationWorkflowRow>(
            r#"
            UPDATE remediation_workflows
            SET is_enabled = COALESCE($2, is_enabled),
                is_latest_version = COALESCE($3, is_latest_version),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, version, description, container_image, spec, labels,
                      is_enabled, is_latest_version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.is_enabled)
        .bind(patch.is_latest_version)
        .fetch_optional(&self.pool)
        .await
        .context("failed to update workflow status")?;
        Ok(row)
    }

    pub async fn disable_workflow(&self, id: Uuid) -> Result<Option<RemediationWorkflowRow>> {
        self.update_workflow_status(
            id,
            UpdateWorkflowRow {
                is_enabled: Some(false),
                is_latest_version: None,
            },
        )
        .await
    }

    pub async fn workflow_name_version_exists(&self, name: &str, version: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM remediation_workflows WHERE name = $1 AND version = $2)",
        )
        .bind(name)
        .bind(version)
        .fetch_one(&self.pool)
        .await
        .context("failed to check workflow name/version uniqueness")?;
        Ok(exists)
    }

    pub async fn list_enabled_latest_workflow_ids(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM remediation_workflows WHERE is_enabled = true AND is_latest_version = true",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list enabled workflows")?;
        Ok(ids)
    }

    pub async fn get_workflows_by_ids(&self, ids: &[Uuid]) -> Result<Vec<RemediationWorkflowRow>> {
        let rows = sqlx::query_as::<_, RemediationWorkflowRow>(
            "SELECT * FROM remediation_workflows WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch workflows by id")?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // Dead-letter queue (C6)
    // ---------------------------------------------------------------

    pub async fn enqueue_dlq(&self, input: CreateDlqEntryRow) -> Result<DlqEntryRow> {
        let row = sqlx::query_as::<_, DlqEntryRow>(
            r#"
            INSERT INTO dlq_entries (id, payload_kind, payload, enqueued_at, attempt_count, surfaced)
            VALUES ($1, $2, $3, now(), 0, false)
            RETURNING id, payload_kind, payload, enqueued_at, attempt_count, last_attempt_at, surfaced
            "#,
        )
        .bind(input.id)
        .bind(input.payload_kind)
        .bind(input.payload)
        .fetch_one(&self.pool)
        .await
        .context("failed to enqueue dlq entry")?;
        Ok(row)
    }

    pub async fn list_unsurfaced_dlq_entries(&self, batch_size: i64) -> Result<Vec<DlqEntryRow>> {
        let rows = sqlx::query_as::<_, DlqEntryRow>(
            "SELECT * FROM dlq_entries WHERE surfaced = false ORDER BY enqueued_at LIMIT $1",
        )
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await
        .context("failed to list dlq entries")?;
        Ok(rows)
    }

    pub async fn record_dlq_replay_success(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM dlq_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to remove replayed dlq entry")?;
        Ok(())
    }

    pub async fn record_dlq_replay_failure(
        &self,
        id: Uuid,
        attempt_count: i32,
        surfaced: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE dlq_entries SET attempt_count = $2, last_attempt_at = $3, surfaced = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(attempt_count)
        .bind(now)
        .bind(surfaced)
        .execute(&self.pool)
        .await
        .context("failed to record dlq replay failure")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceFilter {
    pub incident_type: Option<String>,
    pub status: Option<String>,
    pub action_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}
