// RFC 7807 problem-details envelope, replacing control-plane's flat
// `ErrorResponse { error: String }` (api/common.rs) with a structured body
// carrying a type/title/status/detail/instance quad, plus field-level
// validation failures folded into `extensions`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::{GatewayError, WriteMode};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub kind: String,
    pub detail: String,
}

impl ProblemDetails {
    fn new(kind: &str, status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            problem_type: format!("https://errors.gateway.internal/{kind}"),
            title: kind.replace('_', " "),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            errors: None,
        }
    }
}

/// Wraps `GatewayError` so it can cross the axum handler boundary directly
/// via `?`; each handler returns `Result<T, ApiError>`.
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();

        match self.0 {
            GatewayError::Validation(failures) => {
                let mut problem = ProblemDetails::new(
                    kind,
                    StatusCode::BAD_REQUEST,
                    "one or more fields failed validation",
                );
                problem.errors = Some(
                    failures
                        .into_iter()
                        .map(|f| FieldError {
                            field: f.field,
                            kind: format!("{:?}", f.kind).to_lowercase(),
                            detail: f.detail,
                        })
                        .collect(),
                );
                (StatusCode::BAD_REQUEST, Json(problem)).into_response()
            }
            GatewayError::NotFound { resource, id } => {
                let problem = ProblemDetails::new(
                    kind,
                    StatusCode::NOT_FOUND,
                    format!("{resource} {id} not found"),
                );
                (StatusCode::NOT_FOUND, Json(problem)).into_response()
            }
            GatewayError::Conflict(detail) => {
                let problem = ProblemDetails::new(kind, StatusCode::CONFLICT, detail);
                (StatusCode::CONFLICT, Json(problem)).into_response()
            }
            GatewayError::Degraded { reason } => {
                write_mode_response(StatusCode::CREATED, WriteMode::Degraded, reason)
            }
            GatewayError::Accepted { reason } => {
                write_mode_response(StatusCode::ACCEPTED, WriteMode::Dlq, reason)
            }
            GatewayError::Unavailable(detail) => {
                let problem = ProblemDetails::new(kind, StatusCode::SERVICE_UNAVAILABLE, detail);
                (StatusCode::SERVICE_UNAVAILABLE, Json(problem)).into_response()
            }
            GatewayError::Cancelled => {
                // Caller disconnected; nothing meaningful to write back, but
                // axum still requires a response value for this branch.
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST).into_response()
            }
            GatewayError::Timeout => {
                let problem = ProblemDetails::new(
                    kind,
                    StatusCode::GATEWAY_TIMEOUT,
                    "request exceeded its deadline",
                );
                (StatusCode::GATEWAY_TIMEOUT, Json(problem)).into_response()
            }
            GatewayError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                let problem = ProblemDetails::new(
                    kind,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred",
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(problem)).into_response()
            }
        }
    }
}

fn write_mode_response(status: StatusCode, mode: WriteMode, detail: String) -> Response {
    let problem = ProblemDetails::new("write_mode", status, detail);
    let mut response = (status, Json(problem)).into_response();
    if let Some(header_value) = mode.header_value() {
        if let Ok(value) = HeaderValue::from_str(header_value) {
            response.headers_mut().insert("X-Write-Mode", value);
        }
    }
    response
}

/// Attaches the `X-Write-Mode` header to an otherwise-successful response
/// when the write landed in degraded or DLQ mode. `WriteMode::Atomic`
/// leaves the response untouched.
pub fn apply_write_mode_header(response: &mut Response, mode: WriteMode) {
    if let Some(header_value) = mode.header_value() {
        if let Ok(value) = HeaderValue::from_str(header_value) {
            response.headers_mut().insert("X-Write-Mode", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400() {
        let err = GatewayError::validation(vec![
            gateway_core::validation::ValidationFailure::missing("name"),
        ]);
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError(GatewayError::not_found("workflow", uuid::Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let response = ApiError(GatewayError::unavailable("embedding down")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
