// Workflow Search Engine (C10): embed query, vector top-k search,
// similarity threshold, rank, fetch full records, emit an async audit
// event. Grounded in other_examples' SemanticMemoryStore::search_semantic
// contract shape (namespace/query_embedding/limit -> ranked hits), adapted
// to this gateway's filter-by-enabled-and-latest convention.

use std::sync::Arc;
use std::time::Instant;

use gateway_core::domain::{AuditEvent, RemediationWorkflow};
use gateway_core::traits::{AuditSink, EmbeddingProvider, VectorStore};
use gateway_core::{GatewayError, Result};
use gateway_storage::Database;
use uuid::Uuid;

pub struct SearchRequest {
    pub query_text: String,
    pub filters: serde_json::Value,
    pub top_k: usize,
    pub min_similarity: f32,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub workflow: RemediationWorkflow,
    pub rank: usize,
    pub similarity: f32,
}

pub struct SearchEngine {
    db: Database,
    embeddings: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    audit: Arc<dyn AuditSink>,
}

impl SearchEngine {
    pub fn new(
        db: Database,
        embeddings: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db,
            embeddings,
            vectors,
            audit,
        }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        if request.query_text.trim().is_empty() {
            return Err(GatewayError::validation(vec![
                gateway_core::validation::ValidationFailure::missing("query_text"),
            ]));
        }
        if !(0.0..=1.0).contains(&request.min_similarity) {
            return Err(GatewayError::validation(vec![
                gateway_core::validation::ValidationFailure::invalid_format(
                    "min_similarity",
                    "must be between 0.0 and 1.0",
                ),
            ]));
        }

        let search_started = Instant::now();

        let embed_started = Instant::now();
        let embedding_outcome = self
            .embeddings
            .embed_with_meta(&request.query_text)
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;
        let query_vector = embedding_outcome.vector;
        let cache_hit = embedding_outcome.cache_hit;
        let embedding_ms = embed_started.elapsed().as_millis() as i64;

        let db_started = Instant::now();
        let matches = self
            .vectors
            .search_top_k(
                &query_vector,
                request.top_k,
                "is_enabled AND is_latest_version",
            )
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;
        let db_ms = db_started.elapsed().as_millis() as i64;

        let mut above_threshold: Vec<(Uuid, f32)> = matches
            .into_iter()
            .map(|m| (m.id, 1.0 - m.distance))
            .filter(|(_, similarity)| *similarity >= request.min_similarity)
            .collect();

        above_threshold.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let ids: Vec<Uuid> = above_threshold.iter().map(|(id, _)| *id).collect();
        let records = self
            .db
            .get_workflows_by_ids(&ids)
            .await
            .map_err(GatewayError::Internal)?;

        let hits: Vec<SearchHit> = above_threshold
            .into_iter()
            .enumerate()
            .filter_map(|(rank, (id, similarity))| {
                records
                    .iter()
                    .find(|r| r.id == id)
                    .map(|row| SearchHit {
                        workflow: RemediationWorkflow {
                            id: row.id,
                            name: row.name.clone(),
                            version: row.version.clone(),
                            description: row.description.clone(),
                            container_image: row.container_image.clone(),
                            spec: row.spec.clone(),
                            embedding: None,
                            labels: serde_json::from_value(row.labels.clone()).unwrap_or_default(),
                            is_enabled: row.is_enabled,
                            is_latest_version: row.is_latest_version,
                            created_at: row.created_at,
                            updated_at: row.updated_at,
                        },
                        rank: rank + 1,
                        similarity,
                    })
            })
            .collect();

        let search_elapsed = search_started.elapsed();
        metrics::histogram!("workflow_search_duration_seconds").record(search_elapsed.as_secs_f64());
        let search_ms = search_elapsed.as_millis() as i64;

        self.emit_search_audit_event(&request, &hits, search_ms, db_ms, embedding_ms, cache_hit)
            .await;

        Ok(hits)
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_search_audit_event(
        &self,
        request: &SearchRequest,
        hits: &[SearchHit],
        search_ms: i64,
        db_ms: i64,
        embedding_ms: i64,
        cache_hit: bool,
    ) {
        let results: Vec<_> = hits
            .iter()
            .map(|h| {
                serde_json::json!({
                    "workflow_id": h.workflow.id,
                    "version": h.workflow.version,
                    "rank": h.rank,
                    "similarity": h.similarity,
                })
            })
            .collect();

        let event_data = serde_json::json!({
            "query_text": request.query_text,
            "filters": request.filters,
            "top_k": request.top_k,
            "min_similarity": request.min_similarity,
            "search_duration_ms": search_ms,
            "db_query_time_ms": db_ms,
            "embedding_time_ms": embedding_ms,
            "cache_hit": cache_hit,
            "results": results,
        });

        let event = AuditEvent::service_generated(
            "workflow.catalog.search_completed",
            "workflow",
            "success",
            request.correlation_id,
            event_data,
        );

        // Never await the audit path's completion on the response path: a
        // dropped submit future is equivalent to a full buffer, and the
        // sink itself never blocks.
        self.audit.submit(event).await;
    }
}
