//! Rotating pool of interchangeable upstream credentials

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::HeaderValue;
use tracing::info;

use crate::error::{AppError, Result};

/// Opaque upstream access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Ordered credentials plus a cursor naming the one in use.
///
/// The cursor always satisfies `cursor < len`; it only moves through
/// [`CredentialPool::rotate`].
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Create a pool; fails if no usable credential is given
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() || credentials.iter().any(|c| c.0.trim().is_empty()) {
            return Err(AppError::Config(config::ConfigError::Message(
                "Credential pool requires at least one non-blank credential".to_string(),
            )));
        }

        // Every token must fit in an Authorization header
        if let Some(slot) = credentials
            .iter()
            .position(|c| HeaderValue::from_str(&format!("Bearer {}", c.0)).is_err())
        {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "Credential {} contains characters not allowed in an HTTP header",
                slot
            ))));
        }

        info!(size = credentials.len(), "Initialized credential pool");

        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Build a pool from raw tokens
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(tokens.into_iter().map(Credential::new).collect())
    }

    /// Credential at the cursor
    pub fn current(&self) -> &Credential {
        self.current_with_slot().1
    }

    /// Cursor position and the credential there, from a single load
    pub fn current_with_slot(&self) -> (usize, &Credential) {
        let slot = self.cursor();
        (slot, &self.credentials[slot])
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Advance the cursor by one, wrapping. Returns the new position.
    pub fn rotate(&self) -> usize {
        let len = self.credentials.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        (previous + 1) % len
    }

    /// Number of credentials, used as the retry bound
    pub fn size(&self) -> usize {
        self.credentials.len()
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.size())
            .field("cursor", &self.cursor())
            .finish()
    }
}
