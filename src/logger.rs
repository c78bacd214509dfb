//! Injected logging boundary
//!
//! The client never logs through global state on its own: every structured
//! log entry goes through the [`Logger`] handed to it at construction.
//! [`TracingLogger`] forwards to the `tracing` ecosystem and is what the
//! binary uses; [`MemoryLogger`] keeps entries in memory for assertions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capability set for structured logging
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, context: Value);
    fn info(&self, message: &str, context: Value);
    fn warn(&self, message: &str, context: Value);
    fn error(&self, message: &str, context: Value);
}

/// Forwards log entries to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, context: Value) {
        tracing::debug!(context = %context, "{}", message);
    }

    fn info(&self, message: &str, context: Value) {
        tracing::info!(context = %context, "{}", message);
    }

    fn warn(&self, message: &str, context: Value) {
        tracing::warn!(context = %context, "{}", message);
    }

    fn error(&self, message: &str, context: Value) {
        tracing::error!(context = %context, "{}", message);
    }
}

/// Severity of a recorded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One entry captured by [`MemoryLogger`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: Value,
}

/// Logger that records every entry in memory
#[derive(Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Entries recorded at `level`
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, level: LogLevel, message: &str, context: Value) {
        self.lock().push(LogEntry {
            level,
            message: message.to_string(),
            context,
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str, context: Value) {
        self.record(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: Value) {
        self.record(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: Value) {
        self.record(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: Value) {
        self.record(LogLevel::Error, message, context);
    }
}

impl fmt::Debug for MemoryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLogger")
            .field("entries", &self.lock().len())
            .finish()
    }
}
