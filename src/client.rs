//! The exposed client surface
//!
//! [`GenerativeClient`] wires validation, the model registry and the
//! generation engine over one injected backend and logger.

use crate::backend::InferenceBackend;
use crate::config::{ClientConfig, DEFAULT_MODEL};
use crate::error::{ErrorKind, GenerativeError, Result};
use crate::generation::{GenerateResult, GenerationEngine, RetryPolicy, StreamHandler};
use crate::logger::Logger;
use crate::registry::{ModelConfigOptions, ModelDescriptor, ModelManager, ModelStatus};
use crate::validator::validate_generate_request;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Client for a local inference server
///
/// # Example
///
/// ```no_run
/// use localgen::{ClientConfig, GenerativeClient, GenerateRequest, TracingLogger};
/// use std::sync::Arc;
///
/// # async fn example() -> localgen::Result<()> {
/// let client = GenerativeClient::from_config(&ClientConfig::default(), Arc::new(TracingLogger))?;
/// let text = client
///     .generate(&GenerateRequest::new("Why is the sky blue?"), None)
///     .await?;
/// println!("{}", text);
/// # Ok(())
/// # }
/// ```
pub struct GenerativeClient {
    backend: Arc<dyn InferenceBackend>,
    logger: Arc<dyn Logger>,
    default_model: String,
    engine: GenerationEngine,
    models: ModelManager,
}

impl GenerativeClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, logger: Arc<dyn Logger>) -> Self {
        Self {
            engine: GenerationEngine::new(
                Arc::clone(&backend),
                Arc::clone(&logger),
                RetryPolicy::default(),
            ),
            models: ModelManager::new(Arc::clone(&backend), Arc::clone(&logger)),
            default_model: DEFAULT_MODEL.to_string(),
            backend,
            logger,
        }
    }

    /// Builds an HTTP-backed client from validated settings
    pub fn from_config(config: &ClientConfig, logger: Arc<dyn Logger>) -> Result<Self> {
        config.validate().map_err(|e| {
            GenerativeError::initialization(format!("Invalid configuration: {}", e), e)
        })?;

        let backend = config.create_backend().map_err(|e| {
            GenerativeError::initialization(format!("Failed to create backend: {}", e), e)
        })?;

        logger.debug(
            "Client initialized",
            json!({ "host": config.host, "default_model": config.default_model }),
        );

        Ok(Self::new(backend, logger)
            .with_retry_policy(config.retry_policy())
            .with_default_model(config.default_model.clone()))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.engine =
            GenerationEngine::new(Arc::clone(&self.backend), Arc::clone(&self.logger), policy);
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.engine.retry_policy()
    }

    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    /// Generates text for `request`
    ///
    /// `request` may be a [`crate::GenerateRequest`] or any value serializing
    /// to the same shape. Tokens go to `handler` when the request sets
    /// `stream`.
    pub async fn generate<R>(
        &self,
        request: &R,
        handler: Option<&dyn StreamHandler>,
    ) -> Result<String>
    where
        R: Serialize + ?Sized,
    {
        self.generate_detailed(request, handler)
            .await
            .map(|result| result.text)
    }

    /// Like [`GenerativeClient::generate`], returning token counts, timings
    /// and the context for a follow-up turn
    pub async fn generate_detailed<R>(
        &self,
        request: &R,
        handler: Option<&dyn StreamHandler>,
    ) -> Result<GenerateResult>
    where
        R: Serialize + ?Sized,
    {
        let started = Instant::now();

        let validated = serde_json::to_value(request)
            .map_err(|e| {
                GenerativeError::new(
                    ErrorKind::ValidationFailed,
                    format!("malformed input: {}", e),
                )
                .with_cause(e)
            })
            .and_then(|input| validate_generate_request(&input, &self.default_model));

        let request = match validated {
            Ok(request) => request,
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                self.logger.error(
                    "Generation request rejected",
                    json!({
                        "error": err.message(),
                        "input": err.context_value("input").cloned().unwrap_or(Value::Null),
                        "duration_ms": duration_ms,
                    }),
                );
                return Err(err.with_context("duration_ms", duration_ms));
            }
        };

        self.models.ensure_usable(&request.model).await?;
        self.engine.execute(&request, handler).await
    }

    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        self.models.list_models().await
    }

    /// `Ok(None)` when the server does not know the model
    pub async fn get_model(&self, id: &str) -> Result<Option<ModelDescriptor>> {
        self.models.get_model(id).await
    }

    pub async fn get_model_status(&self, id: &str) -> Result<ModelStatus> {
        self.models.get_model_status(id).await
    }

    pub async fn preload_model(&self, id: &str, config: Option<ModelConfigOptions>) -> Result<()> {
        self.models.preload_model(id, config).await
    }

    pub async fn unload_model(&self, id: &str) -> Result<()> {
        self.models.unload_model(id).await
    }

    pub async fn update_model_config(&self, id: &str, config: ModelConfigOptions) -> Result<()> {
        self.models.update_model_config(id, config).await
    }

    /// Registry state, for inspection
    pub fn models(&self) -> &ModelManager {
        &self.models
    }
}

impl std::fmt::Debug for GenerativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClient")
            .field("backend", &self.backend.name())
            .field("default_model", &self.default_model)
            .field("retry", &self.engine.retry_policy())
            .finish()
    }
}
