//! HTTP route definitions

use crate::api::handlers;
use crate::api::models::*;
use crate::error::{ErrorDetail, ErrorResponse};
use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Image Relay Gateway API",
        description = "Image generation gateway with credential failover and a global rate gate.",
        license(name = "MIT"),
    ),
    paths(
        handlers::generate_image,
        handlers::health_check,
        handlers::check_upstream,
    ),
    components(schemas(
        GenerateImageRequest,
        GenerateImageResponse,
        ImageData,
        HealthResponse,
        UpstreamStatusResponse,
        ErrorResponse,
        ErrorDetail,
    )),
    tags(
        (name = "Images", description = "Image generation endpoints"),
        (name = "Health", description = "Health and connectivity endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    let (cors_enabled, static_files) = (
        state.settings.cors.enabled,
        state.settings.static_files.clone(),
    );

    let api_routes = Router::new()
        .route("/generate-image", post(handlers::generate_image))
        .route("/health", get(handlers::health_check))
        .route("/check-upstream", get(handlers::check_upstream));

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    // Unmatched paths go to the bundled front end, falling back to its index
    let router = if static_files.enabled {
        let index = Path::new(&static_files.dir).join(&static_files.index);
        router.fallback_service(
            ServeDir::new(&static_files.dir).fallback(ServeFile::new(index)),
        )
    } else {
        router
    };

    let router = if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}
