// OpenAPI specification assembly. Used by both main() (for the Swagger UI
// mount) and the export-openapi binary (for static spec generation),
// grounded in control-plane::openapi's split of the ApiDoc derive into its
// own module so neither binary has to duplicate the paths/tags list.

use utoipa::OpenApi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::workflows::create_workflow,
        handlers::workflows::get_workflow,
        handlers::workflows::search_workflows,
        handlers::workflows::update_workflow,
        handlers::workflows::disable_workflow,
        handlers::health::healthz,
        handlers::health::readyz,
    ),
    tags(
        (name = "workflows", description = "Remediation workflow catalog"),
        (name = "health", description = "Liveness, readiness, metrics"),
    ),
    info(
        title = "Incident Remediation Data Gateway",
        version = "0.1.0",
        description = "Dual-write HTTP gateway over a row store and a vector store for incident remediation telemetry",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;
