//! Token stream consumption
//!
//! A streamed generation is drained exactly once. Every event is forwarded
//! to the caller's [`StreamHandler`] before its text is accumulated, and
//! its metric fields are merged into a running snapshot. Tokens already
//! handed to the caller stay delivered when the stream later fails.

use super::types::{CompletionMetrics, GenerateResult};
use crate::backend::{BackendError, CompletionRequest, InferenceBackend};
use crate::logger::Logger;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::time::Instant;

/// Error a handler may return from [`StreamHandler::on_token`]
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied callbacks for streamed generation
///
/// Every callback is optional; the defaults do nothing.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Called for each text fragment, in order
    ///
    /// Returning an error aborts the stream.
    async fn on_token(&self, _token: &str) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called once when the stream finished successfully
    async fn on_complete(&self, _result: &GenerateResult) {}

    /// Called once with the failure before it is propagated
    async fn on_error(&self, _error: &BackendError) {}
}

/// Opens a streaming call and drains it into a result
pub(crate) async fn consume_stream(
    backend: &dyn InferenceBackend,
    request: &CompletionRequest,
    handler: &dyn StreamHandler,
    logger: &dyn Logger,
) -> Result<GenerateResult, BackendError> {
    let started = Instant::now();

    let drained = drain(backend, request, handler).await;
    let (text, metrics) = match drained {
        Ok(drained) => drained,
        Err(err) => {
            handler.on_error(&err).await;
            return Err(err);
        }
    };

    let result = metrics.into_result(text);
    logger.info(
        "Streaming generation completed",
        json!({
            "model": request.model,
            "duration_ms": started.elapsed().as_millis() as u64,
            "prompt_tokens": result.prompt_token_count,
            "total_tokens": result.total_token_count,
            "characters": result.text.chars().count(),
        }),
    );

    handler.on_complete(&result).await;
    Ok(result)
}

async fn drain(
    backend: &dyn InferenceBackend,
    request: &CompletionRequest,
    handler: &dyn StreamHandler,
) -> Result<(String, CompletionMetrics), BackendError> {
    let mut stream = backend.generate_stream(request).await?;
    let mut text = String::new();
    let mut metrics = CompletionMetrics::default();

    while let Some(event) = stream.next().await {
        let chunk = event?;

        handler
            .on_token(&chunk.response)
            .await
            .map_err(|e| BackendError::StreamError {
                message: format!("stream handler failed: {}", e),
            })?;

        text.push_str(&chunk.response);
        metrics.merge(&chunk);
    }

    Ok((text, metrics))
}
