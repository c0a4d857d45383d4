//! Image Relay Gateway
//!
//! Accepts image generation requests, normalizes their parameters, and
//! forwards them to a single upstream provider, spreading load over a pool
//! of credentials that rotates whenever the provider rate-limits one of them.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod shutdown;

pub use error::{AppError, Result};

use std::sync::Arc;

use gateway::{CredentialPool, Dispatcher, HttpUpstream, ImageUpstream, RateGate};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire the gateway against the configured HTTP upstream
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let upstream = Arc::new(HttpUpstream::new(&settings.upstream)?);
        Self::with_upstream(settings, upstream)
    }

    /// Wire the gateway against an arbitrary upstream implementation
    pub fn with_upstream(
        settings: config::Settings,
        upstream: Arc<dyn ImageUpstream>,
    ) -> Result<Self> {
        let pool = Arc::new(CredentialPool::from_tokens(
            settings.credentials.api_keys.iter().cloned(),
        )?);
        let gate = Arc::new(RateGate::new(settings.rate_gate.min_interval()));
        let dispatcher = Arc::new(Dispatcher::new(
            pool,
            gate,
            upstream,
            settings.upstream.timeout(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            dispatcher,
        })
    }
}
