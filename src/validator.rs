//! Request validation
//!
//! Every generation or configuration request passes through here before any
//! network interaction. Inputs arrive as arbitrary JSON values; the output is
//! either a fully defaulted, bounds-checked typed request or a
//! `VALIDATION_FAILED` error carrying the rejected input under `input`.

use crate::error::{ErrorKind, GenerativeError, Result};
use crate::generation::GenerateRequest;
use crate::registry::ModelConfigOptions;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_TOP_P: f64 = 0.0;
pub const MAX_TOP_P: f64 = 1.0;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Why an input was rejected
#[derive(Debug, Error)]
pub enum ValidationIssue {
    #[error("prompt is required")]
    MissingPrompt,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("prompt exceeds {max} characters (got {actual})")]
    PromptTooLong { max: usize, actual: usize },

    #[error("model must not be empty")]
    EmptyModel,

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be at least {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: f64,
        value: f64,
    },

    #[error("{field} must be a finite number")]
    NotANumber { field: &'static str },

    #[error("parameters.extra must not set {0}; use the named field")]
    ReservedKey(String),

    #[error("malformed input: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Shape accepted from callers before defaults are applied
#[derive(Debug, Deserialize)]
struct RawGenerateRequest {
    prompt: Option<String>,
    model: Option<String>,
    #[serde(default)]
    context: Option<Vec<i64>>,
    /// `Some(None)` is an explicit `null`, which is how NaN and infinities serialize
    #[serde(default, deserialize_with = "present")]
    temperature: Option<Option<f64>>,
    #[serde(default, alias = "topP", deserialize_with = "present")]
    top_p: Option<Option<f64>>,
    system: Option<String>,
    stream: Option<bool>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Absent takes `default`; an explicit `null` is rejected
fn sampling_value(
    field: &'static str,
    value: Option<Option<f64>>,
    default: f64,
) -> std::result::Result<f64, ValidationIssue> {
    match value {
        None => Ok(default),
        Some(Some(value)) if value.is_finite() => Ok(value),
        Some(_) => Err(ValidationIssue::NotANumber { field }),
    }
}

fn rejected(issue: ValidationIssue, input: &Value) -> GenerativeError {
    GenerativeError::new(ErrorKind::ValidationFailed, issue.to_string())
        .with_context("input", input.clone())
        .with_cause(issue)
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> std::result::Result<(), ValidationIssue> {
    // NaN fails the range check as well
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationIssue::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

fn build_request(
    input: &Value,
    default_model: &str,
) -> std::result::Result<GenerateRequest, ValidationIssue> {
    let raw: RawGenerateRequest = serde_json::from_value(input.clone())?;

    let prompt = raw.prompt.ok_or(ValidationIssue::MissingPrompt)?;
    let prompt_chars = prompt.chars().count();
    if prompt_chars == 0 {
        return Err(ValidationIssue::EmptyPrompt);
    }
    if prompt_chars > MAX_PROMPT_CHARS {
        return Err(ValidationIssue::PromptTooLong {
            max: MAX_PROMPT_CHARS,
            actual: prompt_chars,
        });
    }

    let model = raw.model.unwrap_or_else(|| default_model.to_string());
    if model.trim().is_empty() {
        return Err(ValidationIssue::EmptyModel);
    }

    let temperature = sampling_value("temperature", raw.temperature, DEFAULT_TEMPERATURE)?;
    check_range("temperature", temperature, MIN_TEMPERATURE, MAX_TEMPERATURE)?;

    let top_p = sampling_value("top_p", raw.top_p, DEFAULT_TOP_P)?;
    check_range("top_p", top_p, MIN_TOP_P, MAX_TOP_P)?;

    Ok(GenerateRequest {
        prompt,
        model,
        context: raw.context.unwrap_or_default(),
        temperature,
        top_p,
        system: raw.system,
        stream: raw.stream.unwrap_or(false),
    })
}

/// Produces a defaulted, bounds-checked generation request
///
/// An omitted `model` becomes `default_model`.
pub fn validate_generate_request(input: &Value, default_model: &str) -> Result<GenerateRequest> {
    build_request(input, default_model).map_err(|issue| rejected(issue, input))
}

/// Produces a bounds-checked model configuration
pub fn validate_model_config(input: &Value) -> Result<ModelConfigOptions> {
    let parsed = serde_json::from_value::<ModelConfigOptions>(input.clone())
        .map_err(ValidationIssue::from)
        .and_then(|config| config.validate().map(|_| config));

    parsed.map_err(|issue| rejected(issue, input))
}

/// Re-checks an already typed configuration
pub fn check_model_config(config: &ModelConfigOptions) -> Result<()> {
    config.validate().map_err(|issue| {
        let input = serde_json::to_value(config).unwrap_or(Value::Null);
        rejected(issue, &input)
    })
}
