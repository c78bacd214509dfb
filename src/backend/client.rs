use super::error::BackendError;
use super::types::{ChunkStream, CompletionChunk, CompletionRequest, RemoteModel};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Remote capability set of the inference server
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Single-shot generation
    async fn generate(&self, request: &CompletionRequest) -> Result<CompletionChunk, BackendError>;

    /// Opens a streaming generation
    async fn generate_stream(&self, request: &CompletionRequest)
        -> Result<ChunkStream, BackendError>;

    /// Lists models available on the server
    async fn list(&self) -> Result<Vec<RemoteModel>, BackendError>;

    /// Returns the raw configuration of one model
    async fn show(&self, model: &str) -> Result<Value, BackendError>;

    /// Fetches and loads a model
    async fn pull(&self, model: &str) -> Result<(), BackendError>;

    /// Releases a model
    async fn delete(&self, model: &str) -> Result<(), BackendError>;

    /// Applies a flat parameter set to a model
    async fn update_model(
        &self,
        model: &str,
        parameters: &Map<String, Value>,
    ) -> Result<(), BackendError>;

    fn name(&self) -> &str;

    fn endpoint(&self) -> Option<String> {
        None
    }
}
