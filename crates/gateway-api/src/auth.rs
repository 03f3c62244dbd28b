// Pre-authenticated principal extraction. Per SPEC_FULL.md §1, a token
// validator sits in front of this service (an edge proxy or API gateway);
// this extractor only reads the header/claim set that upstream already
// validated. Grounded in control-plane::auth::middleware's `AuthUser`
// `FromRequestParts` extractor shape, stripped of the JWT/OAuth/API-key
// validation this service deliberately doesn't perform itself.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

const PRINCIPAL_HEADER: &str = "x-principal-id";
const ROLES_HEADER: &str = "x-principal-roles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub principal_id: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub struct AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "missing or empty x-principal-id header").into_response()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal_id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError)?
            .to_string();

        let roles = parts
            .headers
            .get(ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self { principal_id, roles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<AuthUser, AuthError> {
        let (mut parts, _) = req.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let req = Request::builder().body(()).unwrap();
        assert!(extract(req).await.is_err());
    }

    #[tokio::test]
    async fn parses_principal_and_roles() {
        let req = Request::builder()
            .header(PRINCIPAL_HEADER, "svc-remediation-worker")
            .header(ROLES_HEADER, "writer, admin")
            .body(())
            .unwrap();
        let user = extract(req).await.unwrap();
        assert_eq!(user.principal_id, "svc-remediation-worker");
        assert!(user.has_role("writer"));
        assert!(user.has_role("admin"));
    }
}
