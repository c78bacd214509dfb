//! Model descriptor and status types held by the registry

use super::config::ModelConfigOptions;
use crate::validator::{
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P, MAX_TEMPERATURE, MAX_TOP_P, MIN_TEMPERATURE, MIN_TOP_P,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Provider tag recorded on every descriptor
pub const PROVIDER: &str = "ollama";

/// Context length assumed for models the server does not describe
pub const DEFAULT_MAX_CONTEXT_LENGTH: u32 = 4096;

/// Valid range and default of a sampling parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

/// What a model supports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub max_context_length: u32,
    pub supports_streaming: bool,
    pub supports_system_prompt: bool,
    pub temperature: ParameterRange,
    pub top_p: ParameterRange,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            max_context_length: DEFAULT_MAX_CONTEXT_LENGTH,
            supports_streaming: true,
            supports_system_prompt: true,
            temperature: ParameterRange {
                min: MIN_TEMPERATURE,
                max: MAX_TEMPERATURE,
                default: DEFAULT_TEMPERATURE,
            },
            top_p: ParameterRange {
                min: MIN_TOP_P,
                max: MAX_TOP_P,
                default: DEFAULT_TOP_P,
            },
        }
    }
}

/// Cached description of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub capabilities: ModelCapabilities,

    /// Last structured configuration applied through this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<ModelConfigOptions>,

    /// Raw configuration blob reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ModelDescriptor {
    /// Descriptor with default capabilities
    pub fn synthesized(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: PROVIDER.to_string(),
            capabilities: ModelCapabilities::default(),
            custom_config: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Runtime state of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Ready,
    Loading,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Ready => write!(f, "ready"),
            StatusKind::Loading => write!(f, "loading"),
            StatusKind::Error => write!(f, "error"),
        }
    }
}

/// Last known remote state of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub status: StatusKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl Default for ModelStatus {
    /// Status assumed for a model never observed before
    fn default() -> Self {
        Self {
            loaded: false,
            status: StatusKind::Loading,
            memory_usage: None,
            error: None,
            last_used: None,
        }
    }
}

impl ModelStatus {
    /// Ready status stamped with the current time
    pub fn ready(loaded: bool) -> Self {
        Self {
            loaded,
            status: StatusKind::Ready,
            memory_usage: None,
            error: None,
            last_used: Some(Utc::now()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == StatusKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_synthesized_descriptor_defaults() {
        let descriptor = ModelDescriptor::synthesized("llama2");

        assert_eq!(descriptor.id, "llama2");
        assert_eq!(descriptor.name, "llama2");
        assert_eq!(descriptor.provider, "ollama");
        assert_eq!(descriptor.capabilities.max_context_length, 4096);
        assert!(descriptor.capabilities.supports_streaming);
        assert!(descriptor.capabilities.supports_system_prompt);
        assert_eq!(descriptor.capabilities.temperature.default, 0.7);
        assert_eq!(descriptor.capabilities.top_p.default, 0.9);
        assert!(descriptor.custom_config.is_none());
    }

    #[test]
    fn test_default_status() {
        let status = ModelStatus::default();
        assert!(!status.loaded);
        assert_eq!(status.status, StatusKind::Loading);
        assert!(status.last_used.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let status = ModelStatus {
            loaded: false,
            status: StatusKind::Error,
            memory_usage: None,
            error: Some("model not found: x".to_string()),
            last_used: None,
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            json!({ "loaded": false, "status": "error", "error": "model not found: x" })
        );
        assert!(status.is_error());
    }
}
