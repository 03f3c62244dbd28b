// POST/GET/PATCH /api/v1/workflows(...) — workflow catalog CRUD (C9) and
// semantic search (C10), §6.4.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use gateway_catalog::{CreateWorkflowInput, SearchRequest, WorkflowStatusPatch};
use gateway_core::domain::{Labels, RemediationWorkflow};
use gateway_core::validation::{Validator, MAX_FREE_TEXT_BYTES, MAX_NAME_BYTES};
use gateway_core::GatewayError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::correlation;
use crate::error::{apply_write_mode_header, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub container_image: String,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub labels: Labels,
}

fn validate_create(request: &CreateWorkflowRequest) -> Result<(), GatewayError> {
    let mut v = Validator::new();
    v.require_non_empty("name", &request.name)
        .bounded_length("name", &request.name, MAX_NAME_BYTES)
        .require_non_empty("version", &request.version)
        .bounded_length("version", &request.version, MAX_NAME_BYTES)
        .require_non_empty("description", &request.description)
        .bounded_length("description", &request.description, MAX_FREE_TEXT_BYTES)
        .sanitized_text("description", &request.description)
        .require_non_empty("container_image", &request.container_image)
        .bounded_length("container_image", &request.container_image, MAX_NAME_BYTES)
        .bounded_labels("labels", request.labels.len());
    v.finish().map_err(GatewayError::validation)
}

#[utoipa::path(
    post,
    path = "/api/v1/workflows",
    request_body = CreateWorkflowRequest,
    responses(
        (status = 201, description = "Workflow created", body = RemediationWorkflow),
        (status = 409, description = "Workflow name/version already exists"),
    ),
    tag = "workflows",
)]
pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_create(&request)?;
    tracing::info!(principal = %auth.principal_id, name = %request.name, "creating workflow");

    let (workflow, mode) = state
        .catalog
        .create(CreateWorkflowInput {
            name: request.name,
            version: request.version,
            description: request.description,
            container_image: request.container_image,
            spec: request.spec,
            labels: request.labels,
        })
        .await?;

    let mut response = (StatusCode::CREATED, Json(workflow)).into_response();
    apply_write_mode_header(&mut response, mode);
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/workflows/{id}",
    responses(
        (status = 200, description = "Workflow found", body = RemediationWorkflow),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "workflows",
)]
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RemediationWorkflow>, ApiError> {
    let started = Instant::now();
    let workflow = state.catalog.get_by_id(id).await?;
    metrics::histogram!("query_duration_seconds", "operation" => "get_workflow")
        .record(started.elapsed().as_secs_f64());
    Ok(Json(workflow))
}

#[derive(Debug, Deserialize)]
pub struct SearchWorkflowsRequest {
    pub query: String,
    #[serde(default)]
    pub filters: serde_json::Value,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub min_similarity: f32,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

fn default_top_k() -> usize {
    10
}

const MAX_TOP_K: usize = 50;

fn validate_search(request: &SearchWorkflowsRequest) -> Result<(), GatewayError> {
    let mut failures = Vec::new();
    if request.top_k == 0 || request.top_k > MAX_TOP_K {
        failures.push(gateway_core::validation::ValidationFailure::invalid_format(
            "top_k",
            format!("must be between 1 and {MAX_TOP_K}"),
        ));
    }
    if !(0.0..=1.0).contains(&request.min_similarity) {
        failures.push(gateway_core::validation::ValidationFailure::invalid_format(
            "min_similarity",
            "must be between 0.0 and 1.0",
        ));
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation(failures))
    }
}

#[derive(Debug, Serialize)]
pub struct SearchHitResponse {
    pub workflow: RemediationWorkflow,
    pub rank: usize,
    pub similarity: f32,
}

#[utoipa::path(
    post,
    path = "/api/v1/workflows/search",
    request_body = SearchWorkflowsRequest,
    responses((status = 200, description = "Ranked search hits")),
    tag = "workflows",
)]
pub async fn search_workflows(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchWorkflowsRequest>,
) -> Result<Json<Vec<SearchHitResponse>>, ApiError> {
    validate_search(&request)?;

    let correlation_id = request
        .correlation_id
        .as_deref()
        .map(correlation::resolve)
        .unwrap_or_else(Uuid::now_v7);

    let hits = state
        .search
        .search(SearchRequest {
            query_text: request.query,
            filters: request.filters,
            top_k: request.top_k,
            min_similarity: request.min_similarity,
            correlation_id,
        })
        .await?;

    Ok(Json(
        hits.into_iter()
            .map(|h| SearchHitResponse {
                workflow: h.workflow,
                rank: h.rank,
                similarity: h.similarity,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateWorkflowRequest {
    pub is_enabled: Option<bool>,
}

#[utoipa::path(
    patch,
    path = "/api/v1/workflows/{id}",
    request_body = UpdateWorkflowRequest,
    responses(
        (status = 200, description = "Workflow updated", body = RemediationWorkflow),
        (status = 400, description = "Attempted to mutate an immutable field"),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "workflows",
)]
pub async fn update_workflow(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWorkflowRequest>,
) -> Result<Json<RemediationWorkflow>, ApiError> {
    tracing::info!(principal = %auth.principal_id, workflow_id = %id, "updating workflow");
    let workflow = state
        .catalog
        .update_status(
            id,
            WorkflowStatusPatch {
                is_enabled: request.is_enabled,
            },
        )
        .await?;
    Ok(Json(workflow))
}

#[utoipa::path(
    patch,
    path = "/api/v1/workflows/{id}/disable",
    responses(
        (status = 200, description = "Workflow disabled", body = RemediationWorkflow),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "workflows",
)]
pub async fn disable_workflow(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RemediationWorkflow>, ApiError> {
    tracing::info!(principal = %auth.principal_id, workflow_id = %id, "disabling workflow");
    Ok(Json(state.catalog.disable(id).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/workflows", axum::routing::post(create_workflow))
        .route("/api/v1/workflows/search", axum::routing::post(search_workflows))
        .route("/api/v1/workflows/:id", axum::routing::get(get_workflow).patch(update_workflow))
        .route("/api/v1/workflows/:id/disable", axum::routing::patch(disable_workflow))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_rejects_unknown_fields() {
        let raw = serde_json::json!({"is_enabled": false, "spec": {"steps": []}});
        let parsed: Result<UpdateWorkflowRequest, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    fn base_search_request() -> SearchWorkflowsRequest {
        SearchWorkflowsRequest {
            query: "restart the pod".to_string(),
            filters: serde_json::Value::Null,
            top_k: 10,
            min_similarity: 0.5,
            correlation_id: None,
        }
    }

    #[test]
    fn accepts_boundary_min_similarity() {
        for value in [0.0, 1.0] {
            let mut request = base_search_request();
            request.min_similarity = value;
            assert!(validate_search(&request).is_ok(), "{value} should validate");
        }
    }

    #[test]
    fn rejects_min_similarity_outside_unit_interval() {
        for value in [-0.01, 1.01] {
            let mut request = base_search_request();
            request.min_similarity = value;
            assert!(validate_search(&request).is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn rejects_top_k_out_of_range() {
        let mut request = base_search_request();
        request.top_k = 0;
        assert!(validate_search(&request).is_err());

        request.top_k = MAX_TOP_K + 1;
        assert!(validate_search(&request).is_err());
    }
}
