//! Structured model configuration and its flat parameter form
//!
//! [`ModelConfigOptions`] groups settings into parameters, resource limits
//! and performance flags. The server only understands a flat parameter map,
//! produced by [`ModelConfigOptions::to_parameters`] through a fixed rename
//! table. Absent fields are never emitted, so prior remote settings for
//! those fields stay untouched.

use crate::validator::ValidationIssue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const MIN_CONTEXT_LENGTH: u32 = 512;
pub const MAX_CONTEXT_LENGTH: u32 = 32_768;

/// Flat keys produced by the rename table; `parameters.extra` may not use them
pub const RESERVED_PARAMETER_KEYS: &[&str] = &[
    "context_length",
    "gpu_layers",
    "quantization",
    "num_threads",
    "batch_size",
    "max_memory",
    "max_gpu_memory",
    "num_cpu",
    "use_gpu",
    "use_metal",
    "use_tensor_cores",
];

/// Weight precision setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantization {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "4bit")]
    FourBit,
    #[serde(rename = "5bit")]
    FiveBit,
    #[serde(rename = "8bit")]
    EightBit,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::None => "none",
            Quantization::FourBit => "4bit",
            Quantization::FiveBit => "5bit",
            Quantization::EightBit => "8bit",
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model runtime parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default, alias = "contextLength", skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,

    #[serde(default, alias = "gpuLayers", skip_serializing_if = "Option::is_none")]
    pub gpu_layers: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<Quantization>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,

    #[serde(default, alias = "batchSize", skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,

    /// Free-form parameters passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

/// Resource limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, alias = "maxMemory", skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,

    #[serde(default, alias = "maxGpuMemory", skip_serializing_if = "Option::is_none")]
    pub max_gpu_memory: Option<u64>,

    #[serde(default, alias = "cpuCores", skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
}

/// Hardware acceleration flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceFlags {
    #[serde(default, alias = "useGpu", skip_serializing_if = "Option::is_none")]
    pub use_gpu: Option<bool>,

    #[serde(default, alias = "useMetal", skip_serializing_if = "Option::is_none")]
    pub use_metal: Option<bool>,

    #[serde(default, alias = "useTensorCores", skip_serializing_if = "Option::is_none")]
    pub use_tensor_cores: Option<bool>,
}

/// Structured configuration request for one model
///
/// Each group is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfigOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ModelParameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceLimits>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceFlags>,
}

impl ModelConfigOptions {
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_resources(mut self, resources: ResourceLimits) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_performance(mut self, performance: PerformanceFlags) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_none() && self.resources.is_none() && self.performance.is_none()
    }

    /// Checks the numeric bounds of every present field
    pub fn validate(&self) -> Result<(), ValidationIssue> {
        if let Some(params) = &self.parameters {
            if let Some(length) = params.context_length {
                if !(MIN_CONTEXT_LENGTH..=MAX_CONTEXT_LENGTH).contains(&length) {
                    return Err(ValidationIssue::OutOfRange {
                        field: "parameters.context_length",
                        min: MIN_CONTEXT_LENGTH as f64,
                        max: MAX_CONTEXT_LENGTH as f64,
                        value: length as f64,
                    });
                }
            }
            at_least("parameters.threads", params.threads, 1)?;
            at_least("parameters.batch_size", params.batch_size, 1)?;

            if let Some(key) = params.extra.iter().flat_map(|extra| extra.keys()).find(|key| {
                RESERVED_PARAMETER_KEYS.contains(&key.as_str())
            }) {
                return Err(ValidationIssue::ReservedKey(key.clone()));
            }
        }

        if let Some(resources) = &self.resources {
            at_least("resources.cpu_cores", resources.cpu_cores, 1)?;
        }

        Ok(())
    }

    /// Flattens into the server's parameter vocabulary
    pub fn to_parameters(&self) -> Map<String, Value> {
        let mut flat = Map::new();

        if let Some(params) = &self.parameters {
            if let Some(extra) = &params.extra {
                flat.extend(extra.clone());
            }
            put(&mut flat, "context_length", params.context_length);
            put(&mut flat, "gpu_layers", params.gpu_layers);
            put(
                &mut flat,
                "quantization",
                params.quantization.map(|q| q.as_str()),
            );
            put(&mut flat, "num_threads", params.threads);
            put(&mut flat, "batch_size", params.batch_size);
        }

        if let Some(resources) = &self.resources {
            put(&mut flat, "max_memory", resources.max_memory);
            put(&mut flat, "max_gpu_memory", resources.max_gpu_memory);
            put(&mut flat, "num_cpu", resources.cpu_cores);
        }

        if let Some(performance) = &self.performance {
            put(&mut flat, "use_gpu", performance.use_gpu);
            put(&mut flat, "use_metal", performance.use_metal);
            put(&mut flat, "use_tensor_cores", performance.use_tensor_cores);
        }

        flat
    }
}

fn put<T: Into<Value>>(flat: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        flat.insert(key.to_string(), value.into());
    }
}

fn at_least(field: &'static str, value: Option<u32>, min: u32) -> Result<(), ValidationIssue> {
    match value {
        Some(v) if v < min => Err(ValidationIssue::TooSmall {
            field,
            min: min as f64,
            value: v as f64,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_rename_table() {
        let config: ModelConfigOptions = serde_json::from_value(json!({
            "parameters": {
                "contextLength": 8192,
                "gpuLayers": 32,
                "quantization": "4bit",
                "threads": 8,
                "batchSize": 512,
                "extra": { "mirostat": 2 }
            },
            "resources": { "maxMemory": 16, "maxGpuMemory": 8, "cpuCores": 4 },
            "performance": { "useGpu": true, "useMetal": false, "useTensorCores": true }
        }))
        .unwrap();

        let flat = config.to_parameters();
        assert_eq!(
            Value::Object(flat),
            json!({
                "context_length": 8192,
                "gpu_layers": 32,
                "quantization": "4bit",
                "num_threads": 8,
                "batch_size": 512,
                "mirostat": 2,
                "max_memory": 16,
                "max_gpu_memory": 8,
                "num_cpu": 4,
                "use_gpu": true,
                "use_metal": false,
                "use_tensor_cores": true
            })
        );
    }

    #[test]
    fn test_sparse_flattening() {
        let config = ModelConfigOptions::default().with_performance(PerformanceFlags {
            use_gpu: Some(false),
            ..Default::default()
        });

        let flat = config.to_parameters();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["use_gpu"], json!(false));
        assert!(ModelConfigOptions::default().to_parameters().is_empty());
    }

    #[test]
    fn test_validate_bounds() {
        let ok = ModelConfigOptions::default().with_parameters(ModelParameters {
            context_length: Some(512),
            threads: Some(1),
            ..Default::default()
        });
        assert!(ok.validate().is_ok());

        let too_long = ModelConfigOptions::default().with_parameters(ModelParameters {
            context_length: Some(65_536),
            ..Default::default()
        });
        assert!(too_long.validate().is_err());

        let no_cores = ModelConfigOptions::default().with_resources(ResourceLimits {
            cpu_cores: Some(0),
            ..Default::default()
        });
        assert!(no_cores.validate().is_err());
    }

    #[test]
    fn test_extra_cannot_shadow_renamed_fields() {
        let mut extra = Map::new();
        extra.insert("context_length".to_string(), json!(1));
        let config = ModelConfigOptions::default().with_parameters(ModelParameters {
            context_length: Some(4096),
            extra: Some(extra),
            ..Default::default()
        });

        match config.validate() {
            Err(ValidationIssue::ReservedKey(key)) => assert_eq!(key, "context_length"),
            other => panic!("Expected ReservedKey, got {:?}", other),
        }

        let mut extra = Map::new();
        extra.insert("num_ctx_keep".to_string(), json!(4));
        let config = ModelConfigOptions::default().with_parameters(ModelParameters {
            extra: Some(extra),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
        assert_eq!(config.to_parameters()["num_ctx_keep"], 4);
    }

    #[test]
    fn test_quantization_serde() {
        assert_eq!(
            serde_json::to_value(Quantization::EightBit).unwrap(),
            json!("8bit")
        );
        assert!(serde_json::from_value::<Quantization>(json!("3bit")).is_err());
    }
}
