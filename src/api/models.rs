//! API request and response models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::gateway::GenerateParams;

/// Image generation request.
///
/// Fields are taken as raw JSON so that malformed values fall back to
/// defaults instead of failing the whole body.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct GenerateImageRequest {
    /// The prompt to generate images from
    #[serde(default)]
    #[schema(value_type = String, example = "a cat wearing a hat")]
    pub prompt: Option<Value>,

    /// Image width, rounded to a multiple of 16 (default 1024)
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 1024)]
    pub width: Option<Value>,

    /// Image height, rounded to a multiple of 16 (default 1024)
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 1024)]
    pub height: Option<Value>,

    /// Inference steps, 1-4 (default 3)
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 3)]
    pub steps: Option<Value>,

    /// Number of images, 1-4 (default 1)
    #[serde(default, alias = "count")]
    #[schema(value_type = Option<i64>, example = 1)]
    pub n: Option<Value>,
}

impl From<GenerateImageRequest> for GenerateParams {
    fn from(request: GenerateImageRequest) -> Self {
        GenerateParams {
            prompt: request.prompt,
            width: request.width,
            height: request.height,
            steps: request.steps,
            count: request.n,
        }
    }
}

/// Generated image reference
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImageData {
    pub url: String,
}

/// Image generation response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GenerateImageResponse {
    /// Unix timestamp of creation
    pub created: i64,

    /// Generated images, in upstream order
    pub data: Vec<ImageData>,
}

/// Health check response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Size of the upstream credential pool
    pub credentials: usize,
}

/// Upstream connectivity response
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpstreamStatusResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub data: Value,
}
