//! Bounded exponential-delay retry loop

use crate::backend::BackendError;
use crate::logger::Logger;
use serde_json::json;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

const RETRYABLE_MARKERS: [&str; 3] = ["rate limit", "network", "timeout"];

/// Whether a failure text describes a transient condition
///
/// Matching is case-sensitive.
pub fn is_retryable(message: &str) -> bool {
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Retry settings
///
/// Holds no state across calls: every [`RetryPolicy::run`] starts from
/// attempt zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Sleep before retrying after `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget (`max_retries + 1`) is spent
    ///
    /// The closure receives the zero-based attempt index. Only the last
    /// failure is returned.
    pub async fn run<T, F, Fut>(
        &self,
        logger: &dyn Logger,
        model: &str,
        mut attempt: F,
    ) -> Result<T, BackendError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut index = 0;
        loop {
            let err = match attempt(index).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let message = err.to_string();
            if index >= self.max_retries || !is_retryable(&message) {
                return Err(err);
            }

            let delay = self.delay_for(index);
            logger.warn(
                "Generation attempt failed, retrying",
                json!({
                    "attempt": index,
                    "delay_ms": delay.as_millis() as u64,
                    "error": message,
                }),
            );
            tokio::time::sleep(delay).await;

            index += 1;
            logger.debug(
                "Retrying generation",
                json!({ "attempt": index, "model": model }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, MemoryLogger};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn network_error() -> BackendError {
        BackendError::NetworkError {
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_retryable_markers() {
        assert!(is_retryable("rate limit exceeded"));
        assert!(is_retryable("network error: down"));
        assert!(is_retryable("request timeout after 5 seconds"));
        assert!(!is_retryable("model not found: llama9"));
        assert!(!is_retryable("Network unreachable"));
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let logger = MemoryLogger::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run(&logger, "llama2", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(network_error())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(logger.entries_at(LogLevel::Warn).len(), 2);
        assert_eq!(logger.entries_at(LogLevel::Debug).len(), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let logger = MemoryLogger::new();
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(&logger, "llama2", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(network_error()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // no warning for the final attempt
        assert_eq!(logger.entries_at(LogLevel::Warn).len(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let logger = MemoryLogger::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(&logger, "llama9", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(BackendError::ModelNotFound {
                        model: "llama9".to_string(),
                    })
                }
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(logger.entries().is_empty());
    }

    #[tokio::test]
    async fn test_delay_sequence_is_exponential() {
        let logger = MemoryLogger::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(5));

        let result: Result<(), _> = policy
            .run(&logger, "llama2", |_| async {
                Err(BackendError::RateLimitError { retry_after: None })
            })
            .await;

        assert!(result.is_err());
        let delays: Vec<_> = logger
            .entries_at(LogLevel::Warn)
            .iter()
            .map(|entry| entry.context["delay_ms"].as_u64().unwrap())
            .collect();
        assert_eq!(delays, vec![5, 10, 20]);
    }
}
