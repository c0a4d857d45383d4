//! Error types for the gateway

use axum::{
    extract::rejection::JsonRejection,
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Caller-supplied parameters that cannot be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("prompt is required and must not be blank")]
    EmptyPrompt,
}

/// Terminal outcome of a failed dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("rate limit: please wait {}s", ceil_secs(*retry_after))]
    RateLimited { retry_after: Duration },

    #[error("all {attempts} upstream credentials have reached their rate limit")]
    CredentialsExhausted { attempts: usize },

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned an unusable response: {0}")]
    Protocol(String),

    #[error("failed contacting upstream: {0}")]
    Transport(String),
}

impl DispatchError {
    /// Machine-readable kind exposed to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::CredentialsExhausted { .. } => "credentials_exhausted",
            Self::Timeout(_) => "timeout",
            Self::Protocol(_) => "protocol_error",
            Self::Transport(_) => "transport_error",
        }
    }

    /// How long the caller should back off, for gate rejections only
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } | Self::CredentialsExhausted { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Timeout(_) | Self::Protocol(_) | Self::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Whole seconds, rounded up
pub(crate) fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Upstream not responding: {status} {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, AppError>;

/// Error body returned to callers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error kind
    pub kind: String,
    /// Human-readable description
    pub message: String,
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Dispatch(e) => e.kind(),
            Self::InvalidBody(_) => "validation_error",
            Self::Config(_) => "config_error",
            Self::HttpClient(_) => "transport_error",
            Self::Upstream { .. } => "upstream_error",
            Self::UpstreamTimeout(_) => "timeout",
            Self::Io(_) | Self::Internal(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatch(e) => e.status_code(),
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                kind: self.kind().to_string(),
                message: self.to_string(),
            },
        };

        let retry_after = match &self {
            Self::Dispatch(e) => e.retry_after(),
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(wait) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(ceil_secs(wait)));
        }
        response
    }
}
