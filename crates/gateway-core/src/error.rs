// Error taxonomy for the data gateway.
//
// Mirrors the kinds in the error-handling design: ValidationError, NotFound,
// Conflict, Degraded, Accepted, Unavailable, Cancelled, Internal. The HTTP
// layer (gateway-api) maps each variant to its status code and RFC 7807
// envelope; this crate stays HTTP-agnostic.

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationFailure;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation failed")]
    Validation(Vec<ValidationFailure>),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    /// The write committed to the primary store but the derived vector
    /// index update failed or was skipped.
    #[error("write degraded: {reason}")]
    Degraded { reason: String },

    /// The write could not reach the primary path and was enqueued to the
    /// dead-letter queue instead.
    #[error("write accepted for deferred processing: {reason}")]
    Accepted { reason: String },

    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request exceeded its deadline")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn validation(failures: Vec<ValidationFailure>) -> Self {
        Self::Validation(failures)
    }

    pub fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict(detail.into())
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    pub fn accepted(reason: impl Into<String>) -> Self {
        Self::Accepted {
            reason: reason.into(),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable(detail.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Degraded { .. } => "degraded",
            Self::Accepted { .. } => "accepted",
            Self::Unavailable(_) => "unavailable",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_resource_and_id() {
        let id = Uuid::nil();
        let err = GatewayError::not_found("workflow", id);
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("workflow"));
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(GatewayError::Cancelled.kind(), "cancelled");
        assert_eq!(GatewayError::Timeout.kind(), "timeout");
        assert_eq!(GatewayError::conflict("dup").kind(), "conflict");
    }
}
