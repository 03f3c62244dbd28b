// Incident remediation data gateway: bootstrap, wiring, and graceful
// shutdown. Grounded in control-plane::main's bootstrap sequence (telemetry
// init -> database connect -> per-module state construction -> router
// assembly -> serve), generalized so shutdown drives the C13 state machine
// instead of exiting on the first Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use gateway_aggregation::AggregationEngine;
use gateway_api::openapi::ApiDoc;
use gateway_api::{config::AppConfig, handlers, middleware, state::AppState, telemetry};
use gateway_catalog::{CatalogStore, SearchEngine};
use gateway_core::traits::AuditSink;
use gateway_durable::{
    AuditBufferConfig, AuditEventBuffer, GatewayDlqReplayer, InFlightCounter, InternalAuditWriter,
    ReadinessGate, ShutdownConfig, ShutdownCoordinator,
};
use gateway_embeddings::{CachedEmbeddingClient, EmbeddingClientConfig, HttpEmbeddingClient};
use gateway_storage::{Database, DualWriteCoordinator, PgVectorStore};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut telemetry_config = telemetry::TelemetryConfig::from_env();
    telemetry_config.service_version = Some(env!("CARGO_PKG_VERSION").to_string());
    let _telemetry_guard = telemetry::init_telemetry(telemetry_config);

    tracing::info!("gateway-api starting");

    let config = AppConfig::from_env()?;

    let db = Database::connect(&config.database_url, config.max_db_connections)
        .await
        .context("failed to connect to the row store")?;
    db.probe_schema()
        .await
        .context("schema probe failed; refusing to start")?;
    tracing::info!("row store connected and schema probe passed");

    let embedding_client = HttpEmbeddingClient::new(EmbeddingClientConfig::from_env())
        .context("failed to build embedding client")?;
    let embeddings: Arc<dyn gateway_core::traits::EmbeddingProvider> = Arc::new(
        CachedEmbeddingClient::new(embedding_client, config.embedding_cache_capacity),
    );

    let workflow_vectors: Arc<dyn gateway_core::traits::VectorStore> =
        Arc::new(PgVectorStore::new(db.pool().clone(), "workflow_embeddings"));
    let trace_vectors: Arc<dyn gateway_core::traits::VectorStore> =
        Arc::new(PgVectorStore::new(db.pool().clone(), "trace_embeddings"));

    let dual_write = Arc::new(DualWriteCoordinator::new(
        db.clone(),
        embeddings.clone(),
        trace_vectors.clone(),
    ));

    let internal_writer = InternalAuditWriter::new(db.clone());

    let readiness = ReadinessGate::new();
    let in_flight = InFlightCounter::new();
    let shutdown_config = ShutdownConfig {
        drain_deadline: std::time::Duration::from_secs(config.drain_deadline_secs),
        flush_deadline: std::time::Duration::from_secs(config.flush_deadline_secs),
    };
    let shutdown_coordinator = Arc::new(ShutdownCoordinator::new(
        shutdown_config,
        readiness.clone(),
        in_flight.clone(),
    ));

    let (audit_buffer, audit_worker) = AuditEventBuffer::new(
        db.clone(),
        internal_writer.clone(),
        AuditBufferConfig {
            capacity: config.audit_buffer_capacity,
            batch_size: config.audit_batch_size,
            ..AuditBufferConfig::default()
        },
    );
    let audit_buffer = Arc::new(audit_buffer);
    let audit_worker_handle = tokio::spawn(audit_worker);
    let audit: Arc<dyn AuditSink> = audit_buffer.clone();

    let catalog = Arc::new(CatalogStore::new(db.clone(), embeddings.clone(), workflow_vectors.clone()));
    let search = Arc::new(SearchEngine::new(
        db.clone(),
        embeddings.clone(),
        workflow_vectors.clone(),
        audit.clone(),
    ));
    let aggregation = Arc::new(AggregationEngine::new(db.clone()));

    let dlq_replayer = Arc::new(GatewayDlqReplayer::new(db.clone(), internal_writer));
    let dlq_worker = gateway_durable::dlq::DlqReplayWorker::new(
        db.clone(),
        gateway_core::RetryPolicy::dlq_default(),
        config.dlq_batch_size,
        shutdown_coordinator.subscribe(),
    );
    let dlq_worker_handle = tokio::spawn(dlq_worker.run(dlq_replayer));

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install prometheus recorder")?;

    let app_state = Arc::new(AppState {
        db: db.clone(),
        embeddings,
        trace_vectors,
        dual_write,
        audit,
        catalog,
        search,
        aggregation,
        readiness: readiness.clone(),
        in_flight,
        metrics_handle,
    });

    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let business_routes = Router::new()
        .merge(handlers::audit::routes(app_state.clone()))
        .merge(handlers::actions::routes(app_state.clone()))
        .merge(handlers::aggregation::routes(app_state.clone()))
        .merge(handlers::workflows::routes(app_state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::track_in_flight,
        ));

    let mut app = Router::new()
        .merge(build_router_with_prefix(business_routes, &config.api_prefix))
        .merge(handlers::health::routes(app_state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    if !cors_origins.is_empty() {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    "x-correlation-id".parse().unwrap(),
                ])
                .allow_credentials(false),
        );
    }

    app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    tracing::info!(addr = %config.bind_addr, "http server listening");

    let server_readiness = readiness.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await
        .context("server error")?;

    tracing::info!("shutdown signal received, running teardown sequence");
    let _ = server_readiness; // readiness already flipped inside run_shutdown below

    shutdown_coordinator
        .run_shutdown(
            move || audit_buffer.stop_accepting(),
            move || async move {
                let _ = audit_worker_handle.await;
            },
            move || async move {
                dlq_worker_handle.abort();
                let _ = dlq_worker_handle.await;
            },
        )
        .await;

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_routes() -> Router {
        Router::new().route("/v1/test", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn prefix_empty_leaves_routes_unprefixed() {
        let app = build_router_with_prefix(test_routes(), "");
        let response = app
            .oneshot(Request::builder().uri("/v1/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn prefix_set_nests_routes() {
        let app = build_router_with_prefix(test_routes(), "/api");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}
