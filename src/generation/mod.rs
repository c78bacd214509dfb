//! Generation orchestration
//!
//! A validated [`GenerateRequest`] is executed by the [`GenerationEngine`]
//! under a [`RetryPolicy`], either as one single-shot call or as a token
//! stream delivered to a [`StreamHandler`]. Terminal failures are classified
//! into a [`crate::error::ErrorKind`] from their text.

mod executor;
mod retry;
mod stream;
mod types;

pub use executor::GenerationEngine;
pub use retry::{is_retryable, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use stream::{HandlerError, StreamHandler};
pub use types::{CompletionMetrics, GenerateRequest, GenerateResult, DEFAULT_SYSTEM_PROMPT};
