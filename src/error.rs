//! Error taxonomy for every public operation
//!
//! All operations surface a single [`GenerativeError`]: an enumerated
//! [`ErrorKind`], a human message, the wrapped cause (transport error,
//! validation issue, ...) and an optional structured context map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GenerativeError>;

/// Shared, type-erased error cause
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// Kind of failure reported by a [`GenerativeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Client construction failed, or a model lifecycle operation failed
    InitializationFailed,
    /// Generation failed and no more specific pattern matched
    GenerationFailed,
    /// Model is absent from the server or in an error status
    InvalidModel,
    /// Server reported a rate limit
    RateLimitExceeded,
    /// Input failed validation before any remote call
    ValidationFailed,
    /// Transport-level failure or timeout
    NetworkError,
    /// Streaming generation failed
    StreamError,
}

impl ErrorKind {
    /// Stable upper-case identifier for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InitializationFailed => "INITIALIZATION_FAILED",
            ErrorKind::GenerationFailed => "GENERATION_FAILED",
            ErrorKind::InvalidModel => "INVALID_MODEL",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::StreamError => "STREAM_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the client
///
/// Immutable once constructed: the builder-style `with_*` methods consume
/// the error and are only used while it is being assembled.
#[derive(Clone)]
pub struct GenerativeError {
    kind: ErrorKind,
    message: String,
    cause: Option<Cause>,
    context: Option<Map<String, Value>>,
}

impl GenerativeError {
    /// Creates an error with a kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            context: None,
        }
    }

    /// Attaches the underlying error
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attaches an already shared cause
    pub fn with_shared_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Adds one entry to the structured context
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    /// Looks up a single context entry
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.as_ref().and_then(|ctx| ctx.get(key))
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Model unknown to the server or unusable
    pub fn invalid_model(model: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidModel, message).with_context("model", model)
    }

    /// Lifecycle or construction failure wrapping its cause
    pub fn initialization<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(ErrorKind::InitializationFailed, message).with_cause(cause)
    }
}

impl fmt::Display for GenerativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for GenerativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerativeError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .field("context", &self.context)
            .finish()
    }
}

impl StdError for GenerativeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Maps the text of a terminal generation failure to an error kind
///
/// Patterns are matched case-sensitively, first match wins. `streaming`
/// selects [`ErrorKind::StreamError`] as the fallback bucket.
pub fn classify_failure(message: &str, streaming: bool) -> ErrorKind {
    if message.contains("model not found") || message.contains("no such model") {
        ErrorKind::InvalidModel
    } else if message.contains("rate limit") {
        ErrorKind::RateLimitExceeded
    } else if message.contains("network") || message.contains("timeout") {
        ErrorKind::NetworkError
    } else if streaming {
        ErrorKind::StreamError
    } else {
        ErrorKind::GenerationFailed
    }
}
