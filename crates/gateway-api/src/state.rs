// Shared application state, grounded in control-plane::main's
// `AppState { db: Arc<Database> }`, generalized to carry every collaborator
// a handler might need rather than just the database handle.

use std::sync::Arc;

use gateway_aggregation::AggregationEngine;
use gateway_catalog::{CatalogStore, SearchEngine};
use gateway_core::traits::{AuditSink, EmbeddingProvider, VectorStore};
use gateway_durable::{InFlightCounter, ReadinessGate};
use gateway_storage::{Database, DualWriteCoordinator};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub trace_vectors: Arc<dyn VectorStore>,
    pub dual_write: Arc<DualWriteCoordinator>,
    pub audit: Arc<dyn AuditSink>,
    pub catalog: Arc<CatalogStore>,
    pub search: Arc<SearchEngine>,
    pub aggregation: Arc<AggregationEngine>,
    pub readiness: ReadinessGate,
    pub in_flight: InFlightCounter,
    pub metrics_handle: PrometheusHandle,
}
