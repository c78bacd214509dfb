//! Request and result types for text generation

use crate::backend::{CompletionChunk, CompletionRequest, SamplingOptions};
use crate::validator::{DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use serde::{Deserialize, Serialize};

/// System prompt sent when a request carries none
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Validated generation request
///
/// Instances built through the builder methods are not validated; pass them
/// through [`crate::validator::validate_generate_request`] (which the client
/// does on every call) before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,

    /// Empty means the client's default model
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,

    /// Context tokens returned by a previous turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<i64>,

    pub temperature: f64,
    pub top_p: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default)]
    pub stream: bool,
}

impl GenerateRequest {
    /// Request for `prompt` with default sampling and the client's default
    /// model
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: String::new(),
            context: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            system: None,
            stream: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_context(mut self, context: Vec<i64>) -> Self {
        self.context = context;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Wire request, substituting [`DEFAULT_SYSTEM_PROMPT`] when needed
    pub(crate) fn to_completion(&self, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            system: Some(
                self.system
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            context: self.context.clone(),
            stream,
            options: SamplingOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        }
    }
}

/// Outcome of a generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration_ms: Option<u64>,

    pub done: bool,

    /// Tokens to pass as `context` on the next turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<i64>,
}

/// Latest metric values seen on a response
///
/// Each field is overwritten whenever an event carries it, so the snapshot
/// always holds the most recent value reported for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionMetrics {
    pub done: bool,
    pub context: Option<Vec<i64>>,
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

fn nanos_to_millis(nanos: Option<u64>) -> Option<u64> {
    nanos.map(|ns| ns / 1_000_000)
}

impl CompletionMetrics {
    pub fn merge(&mut self, chunk: &CompletionChunk) {
        if chunk.done {
            self.done = true;
        }
        if let Some(context) = &chunk.context {
            self.context = Some(context.clone());
        }
        overwrite(&mut self.total_duration, chunk.total_duration);
        overwrite(&mut self.load_duration, chunk.load_duration);
        overwrite(&mut self.prompt_eval_count, chunk.prompt_eval_count);
        overwrite(&mut self.eval_count, chunk.eval_count);
        overwrite(&mut self.eval_duration, chunk.eval_duration);
    }

    /// Total tokens processed, prompt plus generated
    pub fn total_tokens(&self) -> Option<u64> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, eval) => Some(prompt.unwrap_or(0) + eval.unwrap_or(0)),
        }
    }

    pub fn into_result(self, text: String) -> GenerateResult {
        GenerateResult {
            text,
            prompt_token_count: self.prompt_eval_count,
            total_token_count: self.total_tokens(),
            total_duration_ms: nanos_to_millis(self.total_duration),
            load_duration_ms: nanos_to_millis(self.load_duration),
            eval_duration_ms: nanos_to_millis(self.eval_duration),
            done: self.done,
            context: self.context.unwrap_or_default(),
        }
    }
}

fn overwrite(slot: &mut Option<u64>, value: Option<u64>) {
    if value.is_some() {
        *slot = value;
    }
}
