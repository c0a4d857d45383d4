//! Upstream image-generation provider client
//!
//! One call, one classification. Retries and failover live in the
//! dispatcher; this module only talks HTTP to the provider and decides what
//! a response means.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::gateway::credentials::Credential;
use crate::gateway::normalizer::RequestSpec;

/// Embedded error type the provider uses for per-key throttling
pub const MODEL_RATE_LIMIT: &str = "model_rate_limit";

/// Classification of a single upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(Vec<String>),
    RateLimited,
    Timeout,
    ProtocolError(String),
    TransportError(String),
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::ProtocolError(_) => "protocol_error",
            Self::TransportError(_) => "transport_error",
        }
    }
}

/// Provider seam used by the dispatcher
#[async_trait]
pub trait ImageUpstream: Send + Sync {
    /// Issue one generation call that must finish before `deadline`
    async fn issue(
        &self,
        spec: &RequestSpec,
        credential: &Credential,
        deadline: Instant,
    ) -> AttemptOutcome;

    /// Connectivity check against the provider's status endpoint
    async fn check_status(&self, credential: &Credential, timeout: Duration) -> Result<Value>;
}

/// Generation request body (provider wire format)
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub n: u32,
    pub response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
    #[serde(default)]
    error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the provider's image generation API
pub struct HttpUpstream {
    client: Client,
    generations_url: String,
    status_url: String,
    model: String,
}

impl HttpUpstream {
    /// Create a new client from the upstream configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        // No client-wide timeout: every call carries its own deadline.
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base = config.base_url.trim_end_matches('/');

        Ok(Self {
            client,
            generations_url: format!("{}{}", base, config.generations_path),
            status_url: format!("{}{}", base, config.status_path),
            model: config.model.clone(),
        })
    }

    fn headers(&self, credential: &Credential) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", credential.expose())) {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn send(&self, spec: &RequestSpec, credential: &Credential) -> AttemptOutcome {
        let body = GenerationRequest {
            model: &self.model,
            prompt: spec.prompt(),
            width: spec.width(),
            height: spec.height(),
            steps: spec.steps(),
            n: spec.count(),
            response_format: "url",
        };

        let response = match self
            .client
            .post(&self.generations_url)
            .headers(self.headers(credential))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::TransportError(e.to_string()),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return AttemptOutcome::TransportError(e.to_string()),
        };

        classify(status, &bytes, spec.count() as usize)
    }
}

#[async_trait]
impl ImageUpstream for HttpUpstream {
    async fn issue(
        &self,
        spec: &RequestSpec,
        credential: &Credential,
        deadline: Instant,
    ) -> AttemptOutcome {
        debug!(
            url = %self.generations_url,
            width = spec.width(),
            height = spec.height(),
            steps = spec.steps(),
            n = spec.count(),
            "Sending image generation request"
        );

        // Dropping the in-flight future on expiry aborts the request and
        // returns its connection.
        match tokio::time::timeout_at(deadline, self.send(spec, credential)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %self.generations_url, "Upstream request hit its deadline");
                AttemptOutcome::Timeout
            }
        }
    }

    async fn check_status(&self, credential: &Credential, timeout: Duration) -> Result<Value> {
        let request = async {
            let response = self
                .client
                .get(&self.status_url)
                .headers(self.headers(credential))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::Upstream {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            let text = response.text().await?;
            Ok::<_, AppError>(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| AppError::UpstreamTimeout(timeout))?
    }
}

/// Classify a completed upstream response. A success keeps at most
/// `max_images` URLs, in upstream order.
pub fn classify(status: StatusCode, body: &[u8], max_images: usize) -> AttemptOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AttemptOutcome::RateLimited;
    }

    let parsed: GenerationResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return AttemptOutcome::ProtocolError(format!(
                "upstream returned {} with a non-JSON body: {}",
                status, e
            ))
        }
    };

    if let Some(error) = &parsed.error {
        if error.error_type.as_deref() == Some(MODEL_RATE_LIMIT) {
            return AttemptOutcome::RateLimited;
        }
    }

    let urls: Vec<String> = parsed
        .data
        .into_iter()
        .filter_map(|img| img.url)
        .take(max_images)
        .collect();
    if !urls.is_empty() {
        return AttemptOutcome::Success(urls);
    }

    let detail = parsed
        .error
        .and_then(|e| e.message)
        .unwrap_or_else(|| "no image URL returned".to_string());
    AttemptOutcome::ProtocolError(format!("upstream returned {}: {}", status, detail))
}
