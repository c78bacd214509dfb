use async_trait::async_trait;
use localgen::backend::{BackendError, MockBackend};
use localgen::generation::{GenerateResult, HandlerError, StreamHandler};
use localgen::{GenerativeClient, MemoryLogger, RetryPolicy};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Client over a mock backend that knows `llama2`, with millisecond backoff
#[allow(dead_code)]
pub fn mock_client() -> (GenerativeClient, Arc<MockBackend>, Arc<MemoryLogger>) {
    let backend = Arc::new(MockBackend::new());
    backend.add_model("llama2");
    let logger = Arc::new(MemoryLogger::new());

    let client = GenerativeClient::new(backend.clone(), logger.clone())
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
    (client, backend, logger)
}

/// Handler that records every callback
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingHandler {
    pub tokens: Mutex<Vec<String>>,
    pub completed: Mutex<Vec<GenerateResult>>,
    pub errors: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamHandler for RecordingHandler {
    async fn on_token(&self, token: &str) -> Result<(), HandlerError> {
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn on_complete(&self, result: &GenerateResult) {
        self.completed.lock().unwrap().push(result.clone());
    }

    async fn on_error(&self, error: &BackendError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[allow(dead_code)]
pub fn localgen_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("localgen")
}
