//! HTTP request handlers

use crate::api::models::{
    GenerateImageRequest, GenerateImageResponse, HealthResponse, ImageData,
    UpstreamStatusResponse,
};
use crate::error::{AppError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Generate images from a prompt
#[utoipa::path(
    post,
    path = "/api/generate-image",
    request_body = GenerateImageRequest,
    responses(
        (status = 200, description = "Images generated", body = GenerateImageResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 429, description = "Rate limited or all credentials exhausted", body = ErrorResponse),
        (status = 500, description = "Upstream timeout or failure", body = ErrorResponse),
    ),
    tag = "Images"
)]
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>, AppError> {
    let Json(request) = payload?;
    info!("Received image generation request");

    let images = state.dispatcher.generate(request.into()).await?;

    Ok(Json(GenerateImageResponse {
        created: Utc::now().timestamp(),
        data: images.into_iter().map(|url| ImageData { url }).collect(),
    }))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Gateway is running", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credentials: state.dispatcher.pool().size(),
    })
}

/// Check that the upstream provider answers with the current credential
#[utoipa::path(
    get,
    path = "/api/check-upstream",
    responses(
        (status = 200, description = "Upstream reachable", body = UpstreamStatusResponse),
        (status = 500, description = "Upstream timed out or unreachable", body = ErrorResponse),
    ),
    tag = "Health"
)]
pub async fn check_upstream(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UpstreamStatusResponse>, AppError> {
    let credential = state.dispatcher.pool().current();
    let data = state
        .dispatcher
        .upstream()
        .check_status(credential, state.settings.upstream.status_timeout())
        .await?;

    Ok(Json(UpstreamStatusResponse {
        message: "Connected to upstream".to_string(),
        data,
    }))
}
