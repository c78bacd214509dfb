//! Remote backend errors
//!
//! This module defines BackendError, the failure type of every remote call.
//! The rendered text is what the retry engine inspects, so variant messages
//! keep the lower-case markers "network", "timeout", "rate limit" and
//! "model not found" stable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while talking to the inference server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendError {
    /// Server answered with a non-success status
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Server does not know the requested model
    ModelNotFound { model: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded, retry after the specified duration (in seconds)
    RateLimitError { retry_after: Option<u64> },

    /// Connection-level failure
    NetworkError { message: String },

    /// Response body could not be decoded
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Failure while a response stream was being consumed
    StreamError { message: String },

    /// Client could not be built from its settings
    ConfigurationError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl BackendError {
    /// True when the server reported the model as missing
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::ModelNotFound { .. } => true,
            BackendError::ApiError {
                status_code: Some(404),
                ..
            } => true,
            other => {
                let text = other.to_string();
                text.contains("not found") || text.contains("no such model")
            }
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::ModelNotFound { model } => {
                write!(f, "model not found: {}", model)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "request timeout after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "rate limit exceeded")
                }
            }
            BackendError::NetworkError { message } => {
                write!(f, "network error: {}", message)
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "invalid response from server: {}", message)
            }
            BackendError::StreamError { message } => {
                write!(f, "stream error: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "configuration error: {}", message)
            }
            BackendError::Other { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for BackendError {}
