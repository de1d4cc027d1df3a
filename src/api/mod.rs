//! HTTP API layer: health endpoints and the OpenAPI document.
//!
//! With the `swagger-ui` feature the document is browsable at
//! `/swagger-ui` and served raw at `/api-docs/openapi.json`.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the HTTP endpoints.
///
/// The WebSocket endpoint at `/ws` is not representable in OpenAPI and is
/// documented in the crate docs instead.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "emotion-relay",
        description = "Streams video frames over WebSocket to an emotion detector."
    ),
    paths(handlers::system::root_handler, handlers::system::health_handler),
    components(schemas(handlers::system::StatusResponse, handlers::system::HealthResponse)),
    tags((name = "System", description = "Health and liveness"))
)]
pub struct ApiDoc;

/// Builds the HTTP router (everything except `/ws`).
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
