//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding a comma-separated credential list
pub const API_KEYS_ENV: &str = "API_KEYS";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub credentials: CredentialsConfig,
    pub rate_gate: RateGateConfig,
    pub static_files: StaticFilesConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Upstream image-generation provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generations_path")]
    pub generations_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard deadline for a single dispatch attempt
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_status_timeout")]
    pub status_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://api.together.ai".to_string()
}

fn default_generations_path() -> String {
    "/v1/images/generations".to_string()
}

fn default_status_path() -> String {
    "/status".to_string()
}

fn default_model() -> String {
    "black-forest-labs/FLUX.1-schnell-Free".to_string()
}

fn default_timeout() -> u64 {
    120_000
}

fn default_status_timeout() -> u64 {
    8_000
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

/// Upstream credentials, rotated on rate-limit signals
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .finish()
    }
}

/// Global outbound rate gate
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateGateConfig {
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
}

fn default_min_interval() -> u64 {
    6_000
}

impl RateGateConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Static asset serving with single-page-app fallback
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_static_dir")]
    pub dir: String,
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_true() -> bool {
    true
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_index() -> String {
    "index.html".to_string()
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from the default configuration file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/gateway.yaml")
    }

    /// Load settings from a specific configuration file (YAML or TOML)
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path.extension().map_or(false, |ext| ext == "toml") {
            FileFormat::Toml
        } else {
            FileFormat::Yaml
        };

        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("upstream.base_url", default_base_url())?
            .set_default("upstream.generations_path", default_generations_path())?
            .set_default("upstream.status_path", default_status_path())?
            .set_default("upstream.model", default_model())?
            .set_default("upstream.timeout_ms", default_timeout() as i64)?
            .set_default("upstream.status_timeout_ms", default_status_timeout() as i64)?
            .set_default("credentials.api_keys", Vec::<String>::new())?
            .set_default("rate_gate.min_interval_ms", default_min_interval() as i64)?
            .set_default("static_files.enabled", true)?
            .set_default("static_files.dir", default_static_dir())?
            .set_default("static_files.index", default_index())?
            .set_default("cors.enabled", true)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        if path.exists() {
            builder = builder.add_source(File::from(path).format(format));
        }

        builder = builder.add_source(
            Environment::with_prefix("IMG_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Ok(raw) = std::env::var(API_KEYS_ENV) {
            let keys = parse_key_list(&raw);
            if !keys.is_empty() {
                settings.credentials.api_keys = keys;
            }
        }

        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.credentials.api_keys.is_empty() {
            return Err(invalid(format!(
                "At least one upstream credential is required (credentials.api_keys or {})",
                API_KEYS_ENV
            )));
        }

        if self.credentials.api_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(invalid("Upstream credentials cannot be blank"));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(invalid("Upstream timeout cannot be 0"));
        }

        if reqwest::Url::parse(&self.upstream.base_url).is_err() {
            return Err(invalid(format!(
                "Invalid upstream base URL '{}'",
                self.upstream.base_url
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

/// Split a comma-separated credential list, dropping blanks
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            upstream: UpstreamConfig {
                base_url: default_base_url(),
                generations_path: default_generations_path(),
                status_path: default_status_path(),
                model: default_model(),
                timeout_ms: default_timeout(),
                status_timeout_ms: default_status_timeout(),
            },
            credentials: CredentialsConfig::default(),
            rate_gate: RateGateConfig {
                min_interval_ms: default_min_interval(),
            },
            static_files: StaticFilesConfig {
                enabled: true,
                dir: default_static_dir(),
                index: default_index(),
            },
            cors: CorsConfig { enabled: true },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
