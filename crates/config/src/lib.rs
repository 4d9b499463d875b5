//! Configuration loading, validation, and management for PriceLens.
//!
//! Loads configuration from `~/.pricelens/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use pricelens_core::retry::{MAX_ATTEMPTS, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Regions that host the AWS Price List query API.
pub const PRICING_API_REGIONS: &[&str] = &["us-east-1", "ap-south-1", "eu-central-1"];

/// The root configuration structure.
///
/// Maps directly to `~/.pricelens/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion provider to use
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model for parameter extraction and answer phrasing
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for answer phrasing (extraction always runs at 0.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Completion call behaviour
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Pricing catalog access
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo-0125".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    512
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("providers", &self.providers)
            .field("completion", &self.completion)
            .field("catalog", &self.catalog)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Phrase answers with a second completion call (template otherwise)
    #[serde(default = "default_true")]
    pub compose_with_llm: bool,
}

fn default_completion_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}

impl CompletionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_completion_timeout(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            compose_with_llm: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Region hosting the Price List API endpoint
    #[serde(default = "default_endpoint_region")]
    pub endpoint_region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Entries requested per page (the API caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Serve prices from a local JSON price-list dump instead of the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,
}

fn default_endpoint_region() -> String {
    "us-east-1".into()
}
fn default_catalog_timeout() -> u64 {
    15
}
fn default_page_size() -> u32 {
    100
}

impl CatalogConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }

    /// Whether both halves of the access key pair are present.
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("endpoint_region", &self.endpoint_region)
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .field("page_size", &self.page_size)
            .field("fixture_path", &self.fixture_path)
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint_region: default_endpoint_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            timeout_secs: default_catalog_timeout(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            page_size: default_page_size(),
            fixture_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_rate_limit() -> usize {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: Vec::new(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pricelens/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PRICELENS_API_KEY`, then `OPENAI_API_KEY`
    /// - `PRICELENS_PROVIDER`, `PRICELENS_MODEL`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
    /// - `PRICELENS_CATALOG_FIXTURE`
    /// - `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(key) = lookup("PRICELENS_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(provider) = lookup("PRICELENS_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("PRICELENS_MODEL") {
            self.model = model;
        }
        if let Some(id) = lookup("AWS_ACCESS_KEY_ID") {
            self.catalog.access_key_id = Some(id);
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.catalog.secret_access_key = Some(secret);
        }
        if let Some(token) = lookup("AWS_SESSION_TOKEN") {
            self.catalog.session_token = Some(token);
        }
        if let Some(path) = lookup("PRICELENS_CATALOG_FIXTURE") {
            self.catalog.fixture_path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("PORT is not a port: {port}")))?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pricelens")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (name, attempts) in [
            ("completion.max_attempts", self.completion.max_attempts),
            ("catalog.max_attempts", self.catalog.max_attempts),
        ] {
            if attempts == 0 || attempts > MAX_ATTEMPTS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 1 and {MAX_ATTEMPTS}"
                )));
            }
        }

        if self.completion.timeout_secs == 0 || self.catalog.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least one second".into(),
            ));
        }

        if !(1..=100).contains(&self.catalog.page_size) {
            return Err(ConfigError::ValidationError(
                "catalog.page_size must be between 1 and 100".into(),
            ));
        }

        if !PRICING_API_REGIONS.contains(&self.catalog.endpoint_region.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "catalog.endpoint_region must be one of {}",
                PRICING_API_REGIONS.join(", ")
            )));
        }

        if self.gateway.rate_limit_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.rate_limit_per_minute must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            completion: CompletionConfig::default(),
            catalog: CatalogConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
