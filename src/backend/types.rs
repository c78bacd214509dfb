//! Wire-level types exchanged with the inference server
//!
//! These mirror the Ollama HTTP API closely enough to be serialized as
//! request bodies and deserialized from responses, while staying usable by
//! non-HTTP backends such as the mock.

use super::error::BackendError;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Lazy, finite sequence of partial generation events
///
/// Consumed exactly once; it cannot be restarted.
pub type ChunkStream = BoxStream<'static, Result<CompletionChunk, BackendError>>;

/// Sampling parameters sent with a generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
}

/// Body of a generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// System prompt override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Context tokens from a previous turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<i64>,

    /// Whether the server should stream partial events
    pub stream: bool,

    /// Sampling options
    pub options: SamplingOptions,
}

/// One generation event
///
/// A streamed response is a sequence of these; a single-shot response is a
/// single chunk with `done = true`. Durations are in nanoseconds as reported
/// by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Model that produced the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Incremental (streaming) or full (single-shot) response text
    #[serde(default)]
    pub response: String,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,

    /// Context tokens for chaining follow-up turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    /// Number of tokens in the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    /// Number of tokens generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl CompletionChunk {
    /// Creates an intermediate event carrying only text
    pub fn token(text: impl Into<String>) -> Self {
        Self {
            response: text.into(),
            ..Default::default()
        }
    }

    /// Creates a final event carrying the full text
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            response: text.into(),
            done: true,
            ..Default::default()
        }
    }
}

/// Entry of the remote model listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteModel {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

impl RemoteModel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            digest: None,
            modified_at: None,
        }
    }
}
