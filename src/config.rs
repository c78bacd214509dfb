//! Client configuration
//!
//! Settings load from environment variables with defaults.
//!
//! # Environment Variables
//!
//! - `OLLAMA_HOST`: Inference server address - default: "http://localhost:11434"
//! - `LOCALGEN_MODEL`: Model used when a request names none - default: "llama2"
//! - `LOCALGEN_MAX_RETRIES`: Retries after the first attempt - default: "3"
//! - `LOCALGEN_RETRY_DELAY_MS`: Base backoff delay - default: "1000"
//! - `LOCALGEN_REQUEST_TIMEOUT`: Transport timeout in seconds - default: "300"
//! - `LOCALGEN_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use localgen::ClientConfig;
//!
//! let config = ClientConfig::default();
//! config.validate().expect("Invalid configuration");
//! let backend = config.create_backend().expect("backend");
//! ```

use crate::backend::{BackendError, OllamaClient, DEFAULT_TIMEOUT_SECS};
use crate::generation::{RetryPolicy, DEFAULT_MAX_RETRIES};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_ALLOWED_RETRIES: u32 = 10;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Host is not an http(s) URL
    #[error("Invalid host: {0}. Expected an http:// or https:// URL")]
    InvalidHost(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Backend initialization failed
    #[error("Backend initialization failed: {0}")]
    BackendInitError(#[from] BackendError),
}

/// Settings for a [`crate::GenerativeClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Inference server base URL
    pub host: String,

    /// Model used when a request omits one
    pub default_model: String,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base delay of the exponential backoff
    pub retry_delay_ms: u64,

    /// Transport timeout in seconds
    pub request_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Default for ClientConfig {
    /// Loads from environment variables, falling back to defaults for any
    /// missing or unparsable value
    fn default() -> Self {
        let host = env::var("OLLAMA_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let default_model = env::var("LOCALGEN_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let log_level = env::var("LOCALGEN_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            host,
            default_model,
            max_retries: env_parse("LOCALGEN_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay_ms: env_parse("LOCALGEN_RETRY_DELAY_MS").unwrap_or(DEFAULT_RETRY_DELAY_MS),
            request_timeout_secs: env_parse("LOCALGEN_REQUEST_TIMEOUT")
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            log_level,
        }
    }
}

impl ClientConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any check fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Default model must not be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if self.max_retries > MAX_ALLOWED_RETRIES {
            return Err(ConfigError::ValidationFailed(format!(
                "Max retries cannot exceed {}",
                MAX_ALLOWED_RETRIES
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Creates the HTTP backend for the configured host
    pub fn create_backend(&self) -> Result<Arc<OllamaClient>, ConfigError> {
        let client = OllamaClient::with_timeout(self.host.clone(), self.request_timeout())?;
        Ok(Arc::new(client))
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("host".to_string(), self.host.clone());
        map.insert("default_model".to_string(), self.default_model.clone());
        map.insert("max_retries".to_string(), self.max_retries.to_string());
        map.insert(
            "retry_delay_ms".to_string(),
            self.retry_delay_ms.to_string(),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Localgen Configuration:")?;
        writeln!(f, "  Host: {}", self.host)?;
        writeln!(f, "  Default Model: {}", self.default_model)?;
        writeln!(f, "  Max Retries: {}", self.max_retries)?;
        writeln!(f, "  Retry Delay: {}ms", self.retry_delay_ms)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
