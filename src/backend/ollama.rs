//! Ollama HTTP client
//!
//! This module provides the HTTP implementation of [`InferenceBackend`] for
//! the Ollama API. Generation can run single-shot or as an NDJSON stream;
//! model management maps onto `/api/tags`, `/api/show`, `/api/pull`,
//! `/api/delete` and `/api/create`.
//!
//! # Example
//!
//! ```no_run
//! use localgen::backend::{InferenceBackend, OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::with_timeout(
//!     "http://localhost:11434".to_string(),
//!     Duration::from_secs(60),
//! )?;
//!
//! if client.health_check().await? {
//!     for model in client.list().await? {
//!         println!("{}", model.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use super::client::InferenceBackend;
use super::error::BackendError;
use super::types::{ChunkStream, CompletionChunk, CompletionRequest, RemoteModel};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default request timeout for Ollama API calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama client for local LLM inference
///
/// Holds a pooled HTTP client; it is safe to share behind an `Arc`.
pub struct OllamaClient {
    /// Ollama API endpoint URL
    endpoint: String,

    /// Shared HTTP client with connection pooling
    http_client: Client,

    /// Request timeout duration
    timeout: Duration,
}

impl OllamaClient {
    /// Creates a new Ollama client with default timeout
    ///
    /// ```
    /// use localgen::backend::OllamaClient;
    ///
    /// let client = OllamaClient::new("http://localhost:11434".to_string()).unwrap();
    /// ```
    pub fn new(endpoint: String) -> Result<Self, BackendError> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new Ollama client with custom timeout
    pub fn with_timeout(endpoint: String, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            BackendError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client,
            timeout,
        })
    }

    /// Checks if the Ollama server is available and healthy
    ///
    /// Returns `Ok(false)` when the server is unreachable or times out and
    /// `Err` for any other transport failure.
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        let url = self.url("/api/tags");

        debug!("Checking Ollama health at {}", url);

        match self.http_client.get(&url).send().await {
            Ok(response) => {
                let is_healthy = response.status().is_success();
                if is_healthy {
                    info!("Ollama health check successful");
                } else {
                    warn!(
                        "Ollama health check failed with status: {}",
                        response.status()
                    );
                }
                Ok(is_healthy)
            }
            Err(e) => {
                if e.is_timeout() {
                    warn!("Ollama health check timed out");
                    Ok(false)
                } else if e.is_connect() {
                    warn!("Cannot connect to Ollama at {}", self.endpoint);
                    Ok(false)
                } else {
                    error!("Ollama health check error: {}", e);
                    Err(BackendError::NetworkError {
                        message: format!("Health check failed: {}", e),
                    })
                }
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Sends a JSON request and maps transport and status failures
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        model: Option<&str>,
    ) -> Result<Response, BackendError> {
        let url = self.url(path);

        let response = self
            .http_client
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("Ollama API returned error status {}: {}", status, body);

        Err(status_error(status, &body, model))
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            error!("Ollama request timed out after {:?}", self.timeout);
            BackendError::TimeoutError {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            error!("Cannot connect to Ollama at {}", self.endpoint);
            BackendError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else {
            error!("Ollama request error: {}", e);
            BackendError::NetworkError {
                message: format!("Request failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<CompletionChunk, BackendError> {
        debug!(
            "Sending request to Ollama: model={}, prompt_length={}",
            request.model,
            request.prompt.len()
        );

        let start = Instant::now();
        let body = CompletionRequest {
            stream: false,
            ..request.clone()
        };
        let response = self
            .send(Method::POST, "/api/generate", &body, Some(&request.model))
            .await?;

        let chunk: CompletionChunk = response.json().await.map_err(|e| {
            error!("Failed to parse Ollama response: {}", e);
            BackendError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
                raw_response: None,
            }
        })?;

        if !chunk.done {
            warn!("Ollama response indicates incomplete generation");
        }

        debug!(
            "Ollama generation finished in {:.2}s (model={}, prompt_tokens={}, eval_tokens={})",
            start.elapsed().as_secs_f64(),
            request.model,
            chunk.prompt_eval_count.unwrap_or(0),
            chunk.eval_count.unwrap_or(0)
        );

        Ok(chunk)
    }

    async fn generate_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChunkStream, BackendError> {
        debug!("Opening Ollama stream: model={}", request.model);

        let body = CompletionRequest {
            stream: true,
            ..request.clone()
        };
        let response = self
            .send(Method::POST, "/api/generate", &body, Some(&request.model))
            .await?;

        Ok(ndjson_chunks(response))
    }

    async fn list(&self) -> Result<Vec<RemoteModel>, BackendError> {
        let url = self.url("/api/tags");
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, None));
        }

        let tags: TagsResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    message: format!("Failed to parse model listing: {}", e),
                    raw_response: None,
                })?;

        Ok(tags.models.unwrap_or_default())
    }

    async fn show(&self, model: &str) -> Result<Value, BackendError> {
        let response = self
            .send(
                Method::POST,
                "/api/show",
                &json!({ "model": model }),
                Some(model),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                message: format!("Failed to parse model details: {}", e),
                raw_response: None,
            })
    }

    async fn pull(&self, model: &str) -> Result<(), BackendError> {
        info!("Pulling model {} from {}", model, self.endpoint);
        self.send(
            Method::POST,
            "/api/pull",
            &json!({ "model": model, "stream": false }),
            Some(model),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, model: &str) -> Result<(), BackendError> {
        info!("Deleting model {} from {}", model, self.endpoint);
        self.send(
            Method::DELETE,
            "/api/delete",
            &json!({ "model": model }),
            Some(model),
        )
        .await?;
        Ok(())
    }

    async fn update_model(
        &self,
        model: &str,
        parameters: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        debug!(
            "Updating model {} with {} parameter(s)",
            model,
            parameters.len()
        );
        self.send(
            Method::POST,
            "/api/create",
            &json!({
                "model": model,
                "from": model,
                "parameters": parameters,
                "stream": false,
            }),
            Some(model),
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Response structure of `/api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Option<Vec<RemoteModel>>,
}

/// Error body returned by Ollama
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// One NDJSON line of a streamed generation
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    chunk: CompletionChunk,
}

fn status_error(status: StatusCode, body: &str, model: Option<&str>) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::NOT_FOUND if message.contains("not found") => BackendError::ModelNotFound {
            model: model.unwrap_or("unknown").to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimitError { retry_after: None },
        _ => BackendError::ApiError {
            message,
            status_code: Some(status.as_u16()),
        },
    }
}

fn parse_stream_line(line: &str) -> Result<CompletionChunk, BackendError> {
    let parsed: StreamLine =
        serde_json::from_str(line).map_err(|e| BackendError::InvalidResponse {
            message: format!("Failed to parse stream event: {}", e),
            raw_response: Some(line.chars().take(200).collect()),
        })?;

    match parsed.error {
        Some(message) => Err(BackendError::StreamError { message }),
        None => Ok(parsed.chunk),
    }
}

/// Splits a streamed body into newline-delimited JSON events
///
/// The sequence ends after the first failure.
fn ndjson_chunks(response: Response) -> ChunkStream {
    let bytes = Box::pin(response.bytes_stream());

    stream::unfold(
        (bytes, Vec::<u8>::new(), false),
        |(mut bytes, mut buffer, finished)| async move {
            if finished {
                return None;
            }

            loop {
                if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let item = parse_stream_line(line);
                    let failed = item.is_err();
                    return Some((item, (bytes, buffer, failed)));
                }

                match bytes.next().await {
                    Some(Ok(data)) => buffer.extend_from_slice(&data),
                    Some(Err(e)) => {
                        let item = Err(BackendError::StreamError {
                            message: format!("stream read failed: {}", e),
                        });
                        return Some((item, (bytes, buffer, true)));
                    }
                    None => {
                        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
                        buffer.clear();
                        if rest.is_empty() {
                            return None;
                        }
                        let item = parse_stream_line(&rest);
                        return Some((item, (bytes, buffer, true)));
                    }
                }
            }
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/".to_string()).unwrap();

        assert_eq!(client.endpoint, "http://localhost:11434");
        assert_eq!(client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(client.name(), "ollama");
        assert_eq!(
            client.endpoint(),
            Some("http://localhost:11434".to_string())
        );
    }

    #[test]
    fn test_ollama_client_with_custom_timeout() {
        let client = OllamaClient::with_timeout(
            "http://localhost:11434".to_string(),
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(client.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_status_error_not_found() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            r#"{"error":"model 'llama9' not found, try pulling it first"}"#,
            Some("llama9"),
        );
        assert_eq!(
            err,
            BackendError::ModelNotFound {
                model: "llama9".to_string()
            }
        );
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_status_error_rate_limit_and_generic() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "", None);
        assert!(err.to_string().contains("rate limit"));

        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"out of memory"}"#,
            None,
        );
        assert_eq!(err.to_string(), "API error (500): out of memory");
    }

    #[test]
    fn test_parse_stream_line() {
        let chunk = parse_stream_line(r#"{"model":"llama2","response":" by","done":false}"#)
            .unwrap();
        assert_eq!(chunk.response, " by");

        let err = parse_stream_line(r#"{"error":"model runner crashed"}"#).unwrap_err();
        assert_eq!(
            err,
            BackendError::StreamError {
                message: "model runner crashed".to_string()
            }
        );

        assert!(matches!(
            parse_stream_line("not json"),
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let client = OllamaClient::with_timeout(
            "http://localhost:59999".to_string(),
            Duration::from_millis(100),
        )
        .unwrap();

        let result = client.health_check().await;
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_generate_is_network_error() {
        let client = OllamaClient::with_timeout(
            "http://localhost:59999".to_string(),
            Duration::from_millis(200),
        )
        .unwrap();

        let request = CompletionRequest {
            model: "llama2".to_string(),
            prompt: "hi".to_string(),
            system: None,
            context: Vec::new(),
            stream: false,
            options: crate::backend::SamplingOptions {
                temperature: 0.7,
                top_p: 0.9,
            },
        };

        let err = client.generate(&request).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("network") || text.contains("timeout"));
    }
}
