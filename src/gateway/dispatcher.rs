//! Dispatch controller: validation, rate gate, and bounded credential failover

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::gateway::credentials::CredentialPool;
use crate::gateway::normalizer::{normalize, GenerateParams};
use crate::gateway::rate_gate::{Admission, RateGate};
use crate::gateway::upstream::{AttemptOutcome, ImageUpstream};

/// One upstream call within a dispatch, kept only for logging
#[derive(Debug)]
pub struct DispatchAttempt {
    pub number: usize,
    pub credential_slot: usize,
    pub outcome: AttemptOutcome,
}

/// Orchestrates a generation request end to end
pub struct Dispatcher {
    pool: Arc<CredentialPool>,
    gate: Arc<RateGate>,
    upstream: Arc<dyn ImageUpstream>,
    attempt_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<CredentialPool>,
        gate: Arc<RateGate>,
        upstream: Arc<dyn ImageUpstream>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            gate,
            upstream,
            attempt_timeout,
        }
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn upstream(&self) -> &Arc<dyn ImageUpstream> {
        &self.upstream
    }

    /// Generate images, returning the upstream URLs in order.
    ///
    /// The gate is consulted once per call. Only upstream rate-limit signals
    /// move on to the next credential, and at most `pool.size()` attempts
    /// are made.
    #[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
    pub async fn generate(
        &self,
        params: GenerateParams,
    ) -> std::result::Result<Vec<String>, DispatchError> {
        let spec = normalize(&params).map_err(|e| {
            warn!(error = %e, "Rejected generation request");
            DispatchError::from(e)
        })?;

        if let Admission::Rejected { retry_after } = self.gate.admit() {
            warn!(retry_after_ms = retry_after.as_millis() as u64, "Rate gate rejected request");
            return Err(DispatchError::RateLimited { retry_after });
        }

        let attempts = self.pool.size();
        for number in 1..=attempts {
            let (credential_slot, credential) = self.pool.current_with_slot();
            let deadline = Instant::now() + self.attempt_timeout;

            debug!(attempt = number, of = attempts, slot = credential_slot, "Dispatching");

            let attempt = DispatchAttempt {
                number,
                credential_slot,
                outcome: self.upstream.issue(&spec, credential, deadline).await,
            };
            debug!(attempt = number, outcome = attempt.outcome.label(), "Attempt finished");

            match attempt.outcome {
                AttemptOutcome::Success(images) => {
                    info!(
                        attempt = attempt.number,
                        slot = attempt.credential_slot,
                        images = images.len(),
                        "Image generated successfully"
                    );
                    return Ok(images);
                }
                AttemptOutcome::RateLimited => {
                    let next = self.pool.rotate();
                    warn!(
                        attempt = attempt.number,
                        slot = attempt.credential_slot,
                        next_slot = next,
                        "Credential rate limited upstream, switching to next credential"
                    );
                }
                AttemptOutcome::Timeout => {
                    warn!(attempt = attempt.number, slot = attempt.credential_slot, "Upstream timeout");
                    return Err(DispatchError::Timeout(self.attempt_timeout));
                }
                AttemptOutcome::ProtocolError(detail) => {
                    warn!(attempt = attempt.number, detail = %detail, "No image returned");
                    return Err(DispatchError::Protocol(detail));
                }
                AttemptOutcome::TransportError(detail) => {
                    warn!(attempt = attempt.number, detail = %detail, "Upstream request failed");
                    return Err(DispatchError::Transport(detail));
                }
            }
        }

        warn!(attempts, "All credentials exhausted");
        Err(DispatchError::CredentialsExhausted { attempts })
    }
}
