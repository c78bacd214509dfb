//! Model registry
//!
//! Descriptors and statuses of the models this client has observed, the
//! structured model configuration, and the lifecycle operations that keep
//! the cache and the server in step.

mod cache;
mod config;
mod manager;
mod types;

pub use cache::ModelRegistry;
pub use config::{
    ModelConfigOptions, ModelParameters, PerformanceFlags, Quantization, ResourceLimits,
    MAX_CONTEXT_LENGTH, MIN_CONTEXT_LENGTH,
};
pub use manager::ModelManager;
pub use types::{
    ModelCapabilities, ModelDescriptor, ModelStatus, ParameterRange, StatusKind,
    DEFAULT_MAX_CONTEXT_LENGTH, PROVIDER,
};
