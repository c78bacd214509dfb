//! Single-shot and streamed execution of validated requests under retry

use super::retry::RetryPolicy;
use super::stream::{consume_stream, StreamHandler};
use super::types::{CompletionMetrics, GenerateRequest, GenerateResult};
use crate::backend::{BackendError, InferenceBackend};
use crate::error::{classify_failure, GenerativeError, Result};
use crate::logger::Logger;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Runs validated requests against the backend under a retry policy
///
/// Streaming is used only when the request asks for it and a handler is
/// supplied; otherwise a single-shot call returns the full text at once.
pub struct GenerationEngine {
    backend: Arc<dyn InferenceBackend>,
    logger: Arc<dyn Logger>,
    retry: RetryPolicy,
}

impl GenerationEngine {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        logger: Arc<dyn Logger>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            logger,
            retry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn execute(
        &self,
        request: &GenerateRequest,
        handler: Option<&dyn StreamHandler>,
    ) -> Result<GenerateResult> {
        let started = Instant::now();
        let handler = handler.filter(|_| request.stream);
        let streaming = handler.is_some();

        let outcome = match handler {
            Some(handler) => self.run_streaming(request, handler).await,
            None => self.run_single(request).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                if !streaming {
                    self.logger.info(
                        "Generation completed",
                        json!({
                            "model": request.model,
                            "duration_ms": elapsed_ms,
                            "prompt_tokens": result.prompt_token_count,
                            "total_tokens": result.total_token_count,
                        }),
                    );
                }
                Ok(result)
            }
            Err(err) => {
                let message = err.to_string();
                let kind = classify_failure(&message, streaming);
                self.logger.error(
                    "Generation failed",
                    json!({
                        "model": request.model,
                        "kind": kind.as_str(),
                        "error": message,
                        "duration_ms": elapsed_ms,
                        "streaming": streaming,
                    }),
                );
                Err(GenerativeError::new(kind, message)
                    .with_cause(err)
                    .with_context("model", request.model.as_str())
                    .with_context("duration_ms", elapsed_ms))
            }
        }
    }

    async fn run_single(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateResult, BackendError> {
        let wire = &request.to_completion(false);
        let backend = self.backend.as_ref();

        self.retry
            .run(self.logger.as_ref(), &request.model, move |_| async move {
                let chunk = backend.generate(wire).await?;
                let mut metrics = CompletionMetrics::default();
                metrics.merge(&chunk);
                Ok(metrics.into_result(chunk.response))
            })
            .await
    }

    async fn run_streaming(
        &self,
        request: &GenerateRequest,
        handler: &dyn StreamHandler,
    ) -> std::result::Result<GenerateResult, BackendError> {
        let wire = &request.to_completion(true);
        let backend = self.backend.as_ref();
        let logger = self.logger.as_ref();

        self.retry
            .run(logger, &request.model, move |_| {
                consume_stream(backend, wire, handler, logger)
            })
            .await
    }
}

impl std::fmt::Debug for GenerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationEngine")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish()
    }
}
