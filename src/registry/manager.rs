use super::cache::ModelRegistry;
use super::config::ModelConfigOptions;
use super::types::{ModelDescriptor, ModelStatus, StatusKind};
use crate::backend::{BackendError, InferenceBackend};
use crate::error::{GenerativeError, Result};
use crate::logger::Logger;
use crate::validator::check_model_config;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Model lifecycle and configuration management backed by the registry
///
/// Lifecycle decisions (`preload`, `unload`, `update`) read the cached
/// status only. [`ModelManager::get_model_status`] is the one operation that
/// re-verifies against the server and writes the outcome back.
pub struct ModelManager {
    backend: Arc<dyn InferenceBackend>,
    logger: Arc<dyn Logger>,
    registry: ModelRegistry,
}

impl ModelManager {
    pub fn new(backend: Arc<dyn InferenceBackend>, logger: Arc<dyn Logger>) -> Self {
        Self {
            backend,
            logger,
            registry: ModelRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Remote listing merged into the cache
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let started = Instant::now();
        let remote = self.backend.list().await.map_err(|e| {
            self.lifecycle_failure("list", None, "Failed to list models", e, started)
        })?;

        let mut descriptors = Vec::with_capacity(remote.len());
        for model in remote {
            let descriptor = self
                .registry
                .descriptor_or_insert_with(&model.name, || {
                    ModelDescriptor::synthesized(model.name.clone())
                })
                .await;
            descriptors.push(descriptor);
        }

        self.logger.debug(
            "Listed models",
            json!({ "count": descriptors.len() }),
        );
        Ok(descriptors)
    }

    /// Cached descriptor, or a lookup on the server
    ///
    /// A model the server reports as missing yields `Ok(None)`.
    pub async fn get_model(&self, id: &str) -> Result<Option<ModelDescriptor>> {
        if let Some(descriptor) = self.registry.descriptor(id).await {
            return Ok(Some(descriptor));
        }

        let started = Instant::now();
        match self.backend.show(id).await {
            Ok(raw) => {
                let descriptor = self
                    .registry
                    .descriptor_or_insert_with(id, || {
                        ModelDescriptor::synthesized(id).with_metadata(raw)
                    })
                    .await;
                Ok(Some(descriptor))
            }
            Err(e) if e.is_not_found() => {
                self.logger
                    .debug("Model not found on server", json!({ "model": id }));
                Ok(None)
            }
            Err(e) => {
                let message = format!("Failed to look up model {}: {}", id, e);
                self.log_failure("get_model", id, &message, started);
                Err(GenerativeError::invalid_model(id, message)
                    .with_cause(e)
                    .with_context("duration_ms", elapsed_ms(started)))
            }
        }
    }

    /// Re-verifies the model on the server and caches the outcome
    pub async fn get_model_status(&self, id: &str) -> Result<ModelStatus> {
        let mut status = self.registry.status(id).await;

        match self.backend.show(id).await {
            Ok(_) => {
                status.loaded = true;
                status.status = StatusKind::Ready;
                status.error = None;
            }
            Err(e) => {
                status.loaded = false;
                status.status = StatusKind::Error;
                status.error = Some(e.to_string());
            }
        }

        self.registry.set_status(id, status.clone()).await;
        Ok(status)
    }

    /// Loads the model, or reconfigures it when it is already loaded
    pub async fn preload_model(&self, id: &str, config: Option<ModelConfigOptions>) -> Result<()> {
        if let Some(config) = &config {
            self.check_config("preload", id, config)?;
        }

        if self.registry.status(id).await.loaded {
            if let Some(config) = config {
                self.update_model_config(id, config).await?;
            }
            return Ok(());
        }

        self.load_model(id, config.as_ref()).await
    }

    /// Releases the model; a model not loaded is left alone
    pub async fn unload_model(&self, id: &str) -> Result<()> {
        if !self.registry.status(id).await.loaded {
            return Ok(());
        }

        let started = Instant::now();
        self.backend.delete(id).await.map_err(|e| {
            self.lifecycle_failure("unload", Some(id), "Failed to unload model", e, started)
        })?;

        self.registry
            .set_status(
                id,
                ModelStatus {
                    loaded: false,
                    status: StatusKind::Ready,
                    memory_usage: None,
                    error: None,
                    last_used: Some(Utc::now()),
                },
            )
            .await;
        self.logger.info("Model unloaded", json!({ "model": id }));
        Ok(())
    }

    /// Applies `config`, cycling the model when it is loaded
    pub async fn update_model_config(&self, id: &str, config: ModelConfigOptions) -> Result<()> {
        let started = Instant::now();
        self.check_config("configure", id, &config)?;

        if self.get_model(id).await?.is_none() {
            let message = format!("model not found: {}", id);
            self.log_failure("configure", id, &message, started);
            return Err(GenerativeError::invalid_model(id, message)
                .with_context("duration_ms", elapsed_ms(started)));
        }

        self.apply_model_config(id, &config).await?;

        if self.registry.status(id).await.loaded {
            self.unload_model(id).await?;
            self.load_model(id, Some(&config)).await?;
        }

        self.logger
            .info("Model configuration updated", json!({ "model": id }));
        Ok(())
    }

    /// Sends the flattened configuration and records it on the descriptor
    pub async fn apply_model_config(&self, id: &str, config: &ModelConfigOptions) -> Result<()> {
        let started = Instant::now();
        self.check_config("configure", id, config)?;

        let parameters = config.to_parameters();
        self.backend
            .update_model(id, &parameters)
            .await
            .map_err(|e| {
                self.lifecycle_failure(
                    "configure",
                    Some(id),
                    "Failed to apply model configuration",
                    e,
                    started,
                )
            })?;

        let structured = config.clone();
        self.registry
            .update_descriptor(id, move |descriptor| {
                descriptor.custom_config = Some(structured);
            })
            .await;

        self.logger.debug(
            "Applied model configuration",
            json!({ "model": id, "parameters": parameters }),
        );
        Ok(())
    }

    fn check_config(&self, operation: &str, id: &str, config: &ModelConfigOptions) -> Result<()> {
        let started = Instant::now();
        check_model_config(config).map_err(|e| {
            self.log_failure(operation, id, e.message(), started);
            e
        })
    }

    /// Rejects models whose cached status is `error` or that the server does
    /// not know
    pub async fn ensure_usable(&self, id: &str) -> Result<()> {
        let started = Instant::now();
        if let Some(status) = self.registry.cached_status(id).await {
            if status.is_error() {
                let reason = status.error.unwrap_or_else(|| "unknown error".to_string());
                let message = format!("Model {} is in error state: {}", id, reason);
                self.log_failure("generate", id, &message, started);
                return Err(GenerativeError::invalid_model(id, message)
                    .with_context("duration_ms", elapsed_ms(started)));
            }
        }

        if self.registry.contains(id).await {
            return Ok(());
        }

        match self.get_model(id).await? {
            Some(_) => Ok(()),
            None => {
                let message = format!("model not found: {}", id);
                self.log_failure("generate", id, &message, started);
                Err(GenerativeError::invalid_model(id, message)
                    .with_context("duration_ms", elapsed_ms(started)))
            }
        }
    }

    async fn load_model(&self, id: &str, config: Option<&ModelConfigOptions>) -> Result<()> {
        if let Some(config) = config {
            self.apply_model_config(id, config).await?;
        }

        let started = Instant::now();
        self.backend.pull(id).await.map_err(|e| {
            self.lifecycle_failure("preload", Some(id), "Failed to load model", e, started)
        })?;

        self.registry.set_status(id, ModelStatus::ready(true)).await;
        self.logger.info(
            "Model loaded",
            json!({ "model": id, "duration_ms": elapsed_ms(started) }),
        );
        Ok(())
    }

    fn lifecycle_failure(
        &self,
        operation: &str,
        model: Option<&str>,
        summary: &str,
        cause: BackendError,
        started: Instant,
    ) -> GenerativeError {
        let message = format!("{}: {}", summary, cause);
        self.log_failure(operation, model.unwrap_or_default(), &message, started);

        let err = GenerativeError::initialization(message, cause)
            .with_context("operation", operation)
            .with_context("duration_ms", elapsed_ms(started));
        match model {
            Some(model) => err.with_context("model", model),
            None => err,
        }
    }

    fn log_failure(&self, operation: &str, model: &str, message: &str, started: Instant) {
        self.logger.error(
            "Model operation failed",
            json!({
                "operation": operation,
                "model": model,
                "error": message,
                "duration_ms": elapsed_ms(started),
            }),
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("backend", &self.backend.name())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockCall};
    use crate::error::ErrorKind;
    use crate::logger::MemoryLogger;
    use crate::registry::config::ModelParameters;

    fn manager(backend: Arc<MockBackend>) -> ModelManager {
        ModelManager::new(backend, Arc::new(MemoryLogger::new()))
    }

    fn context_config(length: u32) -> ModelConfigOptions {
        ModelConfigOptions::default().with_parameters(ModelParameters {
            context_length: Some(length),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_list_is_additive() {
        let backend = Arc::new(MockBackend::new());
        backend.add_model("llama2");
        backend.add_model("mistral");
        let manager = manager(backend.clone());

        assert_eq!(manager.list_models().await.unwrap().len(), 2);

        backend.remove_model("mistral");
        assert_eq!(manager.list_models().await.unwrap().len(), 1);
        assert_eq!(manager.registry().descriptor_count().await, 2);
    }

    #[tokio::test]
    async fn test_get_model_caches_descriptor() {
        let backend = Arc::new(MockBackend::new());
        backend.add_model("llama2");
        let manager = manager(backend.clone());

        let descriptor = manager.get_model("llama2").await.unwrap().unwrap();
        assert!(descriptor.metadata.is_some());
        manager.get_model("llama2").await.unwrap();

        assert_eq!(backend.call_count("show"), 1);
        assert!(manager.get_model("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_model_other_failure_is_invalid_model() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(
            "show",
            BackendError::ApiError {
                message: "internal".to_string(),
                status_code: Some(500),
            },
        );

        let err = manager(backend).get_model("llama2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidModel);
        assert!(err.cause().is_some());
    }

    #[tokio::test]
    async fn test_status_reverified() {
        let backend = Arc::new(MockBackend::new());
        let manager = manager(backend.clone());

        let status = manager.get_model_status("llama2").await.unwrap();
        assert!(!status.loaded);
        assert_eq!(status.status, StatusKind::Error);
        assert_eq!(status.error.as_deref(), Some("model not found: llama2"));

        backend.add_model("llama2");
        let status = manager.get_model_status("llama2").await.unwrap();
        assert!(status.loaded);
        assert_eq!(status.status, StatusKind::Ready);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_preload_applies_then_pulls() {
        let backend = Arc::new(MockBackend::new());
        let manager = manager(backend.clone());

        manager
            .preload_model("llama2", Some(context_config(4096)))
            .await
            .unwrap();

        let ops: Vec<_> = backend.calls().iter().map(|c| c.operation()).collect();
        assert_eq!(ops, vec!["update_model", "pull"]);

        let status = manager.registry().status("llama2").await;
        assert!(status.loaded);
        assert!(status.last_used.is_some());

        let descriptor = manager.registry().descriptor("llama2").await.unwrap();
        assert_eq!(descriptor.custom_config, Some(context_config(4096)));
    }

    #[tokio::test]
    async fn test_unload_noop_when_not_loaded() {
        let backend = Arc::new(MockBackend::new());
        let manager = manager(backend.clone());

        manager.unload_model("llama2").await.unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_model_fails() {
        let backend = Arc::new(MockBackend::new());
        let err = manager(backend.clone())
            .update_model_config("ghost", context_config(2048))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidModel);
        assert_eq!(backend.call_count("update_model"), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_remote_call() {
        let backend = Arc::new(MockBackend::new());
        backend.add_model("llama2");
        let manager = manager(backend.clone());

        let err = manager
            .update_model_config("llama2", context_config(100))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(backend.call_count("update_model"), 0);
    }

    #[tokio::test]
    async fn test_pull_failure_is_initialization_failed() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(
            "pull",
            BackendError::NetworkError {
                message: "down".to_string(),
            },
        );
        let manager = manager(backend);

        let err = manager.preload_model("llama2", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        assert_eq!(err.context_value("operation"), Some(&json!("preload")));
        assert!(!manager.registry().status("llama2").await.loaded);
    }

    #[tokio::test]
    async fn test_ensure_usable() {
        let backend = Arc::new(MockBackend::new());
        backend.add_model("llama2");
        let manager = manager(backend.clone());

        assert!(manager.ensure_usable("llama2").await.is_ok());
        assert_eq!(
            manager.ensure_usable("ghost").await.unwrap_err().kind(),
            ErrorKind::InvalidModel
        );

        backend.remove_model("llama2");
        manager.get_model_status("llama2").await.unwrap();
        assert_eq!(
            manager.ensure_usable("llama2").await.unwrap_err().kind(),
            ErrorKind::InvalidModel
        );
        assert!(matches!(backend.calls().last(), Some(MockCall::Show(_))));
    }
}
