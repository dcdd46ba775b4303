//! Application router assembly

use axum::Router;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::role::{roles_router, RolesState};
use crate::shared::health_api::{health_router, HealthState};

/// Roles API under `/api/roles`, health probes under `/health`, the OpenAPI
/// document at `/q/openapi` and Swagger UI at `/swagger-ui`.
pub fn platform_router(roles_state: RolesState, health_state: HealthState) -> Router {
    let (router, mut openapi) = OpenApiRouter::new()
        .nest("/api/roles", roles_router(roles_state))
        .split_for_parts();

    openapi.info.title = "Rolekeeper API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Role management with sub-role composition".to_string());

    Router::new()
        .merge(router)
        .nest("/health", health_router(health_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
}
