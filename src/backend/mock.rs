use super::client::InferenceBackend;
use super::error::BackendError;
use super::types::{ChunkStream, CompletionChunk, CompletionRequest, RemoteModel};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Scripted in-memory backend
///
/// Generation results are served from FIFO queues; model management answers
/// from a list of known model names. Every call is recorded.
pub struct MockBackend {
    models: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<MockResponse>>,
    streams: Mutex<VecDeque<MockStream>>,
    failures: Mutex<HashMap<&'static str, VecDeque<BackendError>>>,
    calls: Mutex<Vec<MockCall>>,
    name: String,
}

/// Scripted single-shot outcome
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub chunk: CompletionChunk,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            chunk: CompletionChunk::complete(content),
            error: None,
        }
    }

    pub fn chunk(chunk: CompletionChunk) -> Self {
        Self { chunk, error: None }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            chunk: CompletionChunk::default(),
            error: Some(error),
        }
    }
}

/// Scripted streaming outcome
#[derive(Debug, Clone, Default)]
pub struct MockStream {
    /// Error returned when opening the stream
    pub open_error: Option<BackendError>,
    /// Events delivered in order
    pub chunks: Vec<CompletionChunk>,
    /// Error raised after all events were delivered
    pub trailing_error: Option<BackendError>,
}

impl MockStream {
    /// Stream of plain text fragments; the last one is marked done
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks: Vec<CompletionChunk> =
            tokens.into_iter().map(CompletionChunk::token).collect();
        if let Some(last) = chunks.last_mut() {
            last.done = true;
        }
        Self {
            chunks,
            ..Default::default()
        }
    }

    pub fn chunks(chunks: Vec<CompletionChunk>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }

    /// Delivers the given fragments, then raises `error`
    pub fn failing_after<I, S>(tokens: I, error: BackendError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: tokens.into_iter().map(CompletionChunk::token).collect(),
            trailing_error: Some(error),
            ..Default::default()
        }
    }

    /// Fails before any event is produced
    pub fn open_error(error: BackendError) -> Self {
        Self {
            open_error: Some(error),
            ..Default::default()
        }
    }
}

/// A call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Generate(CompletionRequest),
    GenerateStream(CompletionRequest),
    List,
    Show(String),
    Pull(String),
    Delete(String),
    UpdateModel(String, Map<String, Value>),
}

impl MockCall {
    /// Operation name, matching the keys accepted by [`MockBackend::fail_next`]
    pub fn operation(&self) -> &'static str {
        match self {
            MockCall::Generate(_) => "generate",
            MockCall::GenerateStream(_) => "generate_stream",
            MockCall::List => "list",
            MockCall::Show(_) => "show",
            MockCall::Pull(_) => "pull",
            MockCall::Delete(_) => "delete",
            MockCall::UpdateModel(_, _) => "update_model",
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_name("MockBackend")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            models: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    /// Makes a model known to `list` and `show`
    pub fn add_model(&self, model: impl Into<String>) {
        let model = model.into();
        let mut models = lock(&self.models);
        if !models.contains(&model) {
            models.push(model);
        }
    }

    pub fn remove_model(&self, model: &str) {
        lock(&self.models).retain(|m| m != model);
    }

    pub fn add_response(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = lock(&self.responses);
        for response in responses {
            queue.push_back(response);
        }
    }

    pub fn add_stream(&self, stream: MockStream) {
        lock(&self.streams).push_back(stream);
    }

    /// Queues a failure for the next call of `operation`
    ///
    /// Accepted operations: `list`, `show`, `pull`, `delete`, `update_model`.
    pub fn fail_next(&self, operation: &'static str, error: BackendError) {
        lock(&self.failures)
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn remaining_responses(&self) -> usize {
        lock(&self.responses).len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn scripted_failure(&self, operation: &'static str) -> Option<BackendError> {
        lock(&self.failures)
            .get_mut(operation)
            .and_then(|queue| queue.pop_front())
    }

    fn knows(&self, model: &str) -> bool {
        lock(&self.models).iter().any(|m| m == model)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn generate(&self, request: &CompletionRequest) -> Result<CompletionChunk, BackendError> {
        self.record(MockCall::Generate(request.clone()));

        let response = lock(&self.responses)
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockBackend: No more responses in queue".to_string(),
            })?;

        match response.error {
            Some(error) => Err(error),
            None => Ok(response.chunk),
        }
    }

    async fn generate_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChunkStream, BackendError> {
        self.record(MockCall::GenerateStream(request.clone()));

        let script = lock(&self.streams)
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockBackend: No more streams in queue".to_string(),
            })?;

        if let Some(error) = script.open_error {
            return Err(error);
        }

        let events = script
            .chunks
            .into_iter()
            .map(Ok)
            .chain(script.trailing_error.map(Err));

        Ok(stream::iter(events).boxed())
    }

    async fn list(&self) -> Result<Vec<RemoteModel>, BackendError> {
        self.record(MockCall::List);
        if let Some(error) = self.scripted_failure("list") {
            return Err(error);
        }
        Ok(lock(&self.models)
            .iter()
            .map(|name| RemoteModel::named(name.clone()))
            .collect())
    }

    async fn show(&self, model: &str) -> Result<Value, BackendError> {
        self.record(MockCall::Show(model.to_string()));
        if let Some(error) = self.scripted_failure("show") {
            return Err(error);
        }
        if !self.knows(model) {
            return Err(BackendError::ModelNotFound {
                model: model.to_string(),
            });
        }
        Ok(json!({
            "modelfile": format!("FROM {}", model),
            "details": { "format": "gguf", "family": "llama" },
        }))
    }

    async fn pull(&self, model: &str) -> Result<(), BackendError> {
        self.record(MockCall::Pull(model.to_string()));
        if let Some(error) = self.scripted_failure("pull") {
            return Err(error);
        }
        self.add_model(model);
        Ok(())
    }

    async fn delete(&self, model: &str) -> Result<(), BackendError> {
        self.record(MockCall::Delete(model.to_string()));
        if let Some(error) = self.scripted_failure("delete") {
            return Err(error);
        }
        Ok(())
    }

    async fn update_model(
        &self,
        model: &str,
        parameters: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        self.record(MockCall::UpdateModel(
            model.to_string(),
            parameters.clone(),
        ));
        if let Some(error) = self.scripted_failure("update_model") {
            return Err(error);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}
