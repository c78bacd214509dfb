//! Remote inference backend
//!
//! The [`InferenceBackend`] trait is the seam between the orchestration
//! layer and the inference server. [`OllamaClient`] speaks HTTP to an
//! Ollama-compatible server; [`MockBackend`] replays scripted results.

mod client;
mod error;
mod mock;
mod ollama;
mod types;

pub use client::InferenceBackend;
pub use error::BackendError;
pub use mock::{MockBackend, MockCall, MockResponse, MockStream};
pub use ollama::{OllamaClient, DEFAULT_TIMEOUT_SECS};
pub use types::{ChunkStream, CompletionChunk, CompletionRequest, RemoteModel, SamplingOptions};
