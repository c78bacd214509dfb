//! localgen - client library for local LLM inference servers
//!
//! This library mediates between application code and an Ollama-compatible
//! inference server. It validates generation requests, retries transient
//! failures with exponential backoff, delivers streamed tokens to a caller
//! handler, and manages model lifecycle and configuration through an
//! in-memory registry.
//!
//! # Core Concepts
//!
//! - **Backend**: the remote capability set ([`InferenceBackend`]), spoken
//!   over HTTP by [`OllamaClient`] or replayed by [`MockBackend`]
//! - **Logger**: injected structured-logging sink ([`Logger`])
//! - **Registry**: cached model descriptors and statuses, owned by one client
//! - **Errors**: every operation fails with a [`GenerativeError`] carrying an
//!   [`ErrorKind`], the original cause and structured context
//!
//! # Example Usage
//!
//! ```no_run
//! use localgen::{ClientConfig, GenerativeClient, GenerateRequest, TracingLogger};
//! use std::sync::Arc;
//!
//! # async fn example() -> localgen::Result<()> {
//! let client = GenerativeClient::from_config(&ClientConfig::default(), Arc::new(TracingLogger))?;
//!
//! let request = GenerateRequest::new("Summarize Rust ownership").with_temperature(0.2);
//! let result = client.generate_detailed(&request, None).await?;
//! println!("{} ({:?} tokens)", result.text, result.total_token_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`backend`]: remote backend trait, HTTP client and mock
//! - [`generation`]: retry engine, streaming consumer and executor
//! - [`registry`]: model cache, lifecycle and configuration
//! - [`validator`]: request validation
//! - [`cli`]: command-line interface

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod generation;
pub mod logger;
pub mod registry;
pub mod util;
pub mod validator;

pub use backend::{BackendError, InferenceBackend, MockBackend, OllamaClient};
pub use client::GenerativeClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ErrorKind, GenerativeError, Result};
pub use generation::{GenerateRequest, GenerateResult, RetryPolicy, StreamHandler};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use registry::{ModelConfigOptions, ModelDescriptor, ModelStatus, StatusKind};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_localgen() {
        assert_eq!(NAME, "localgen");
    }
}
