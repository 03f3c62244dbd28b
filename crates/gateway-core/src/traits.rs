// Trait seams between components, mirroring the teacher's pattern of
// defining DB-agnostic / transport-agnostic traits in the core crate
// (EventEmitter, MessageStore, ToolExecutor in everruns-core) so that
// higher-level components can be exercised against fakes in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::AuditEvent;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Upstream(String),
    #[error("embedding request timed out")]
    Timeout,
}

impl EmbeddingError {
    /// Whether the caller may reasonably retry or proceed without a vector.
    pub fn retryable(&self) -> bool {
        matches!(self, EmbeddingError::Timeout)
    }
}

/// A vector plus whether it came from a cache rather than the upstream
/// embedding model, so callers that care (search audit events) can report
/// it truthfully without downcasting the provider.
#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    pub vector: Vec<f32>,
    pub cache_hit: bool,
}

/// Contract for C2 (Embedding Client): request a fixed-length vector for a
/// normalized text input.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Same as `embed`, but reports whether the vector was served from a
    /// cache. The default implementation always reports a miss; providers
    /// that actually cache (`CachedEmbeddingClient`) override it.
    async fn embed_with_meta(&self, text: &str) -> Result<EmbeddingOutcome, EmbeddingError> {
        Ok(EmbeddingOutcome {
            vector: self.embed(text).await?,
            cache_hit: false,
        })
    }

    /// The fixed dimension this provider always returns, chosen at
    /// service start and never mixed within one deployment.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorStoreError {
    #[error("vector store operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: Uuid,
    pub distance: f32,
}

/// Contract for C4 (Vector-Store Gateway).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, id: Uuid, vector: &[f32]) -> Result<(), VectorStoreError>;

    /// Cosine-distance top-k search, restricted to rows matching `filter_sql`
    /// (a caller-supplied, parameter-free predicate over already-trusted
    /// server-side columns, e.g. `is_enabled AND is_latest_version`).
    async fn search_top_k(
        &self,
        query_vector: &[f32],
        k: usize,
        filter_sql: &str,
    ) -> Result<Vec<VectorMatch>, VectorStoreError>;
}

/// Outcome of submitting an event to the audit buffer (C7 contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ok,
    Full,
}

/// Shared interface implemented by both the async audit buffer (C7) and
/// the internal writer (C8) directly, so callers never need to know which
/// path they're going through.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn submit(&self, event: AuditEvent) -> SubmitOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable_but_upstream_failure_is_not() {
        assert!(EmbeddingError::Timeout.retryable());
        assert!(!EmbeddingError::Upstream("503".into()).retryable());
    }
}
