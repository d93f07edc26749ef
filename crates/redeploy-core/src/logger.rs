//! Operator-facing log sink
//!
//! Diagnostics go through `tracing`. Everything the operator is meant to read
//! while an update runs (stage banners, command output, progress) goes through
//! a [`Logger`], which owns timestamping and rendering. Implementations must
//! serialize their writes: the process supervisor logs from two drain tasks and
//! the calling task at the same time.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of an operator-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Progress,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Progress => write!(f, "progress"),
        }
    }
}

/// Leveled, indented message sink
pub trait Logger: Send + Sync {
    /// Emit one message at the given nesting depth
    fn log(&self, level: LogLevel, message: &str, indent: usize);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, 0);
    }

    fn success(&self, message: &str) {
        self.log(LogLevel::Success, message, 0);
    }

    fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message, 0);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, 0);
    }

    fn progress(&self, message: &str) {
        self.log(LogLevel::Progress, message, 0);
    }
}

/// Shared handle passed to every component that reports to the operator
pub type SharedLogger = Arc<dyn Logger>;

/// Render the leading whitespace for a nesting depth
pub fn indentation(indent: usize) -> String {
    "  ".repeat(indent)
}

/// Logger that forwards to `tracing`, letting the subscriber add timestamps
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, indent: usize) {
        let pad = indentation(indent);
        match level {
            LogLevel::Info | LogLevel::Progress => tracing::info!("{}{}", pad, message),
            LogLevel::Success => tracing::info!("{}✅ {}", pad, message),
            LogLevel::Warning => tracing::warn!("{}{}", pad, message),
            LogLevel::Error => tracing::error!("{}{}", pad, message),
        }
    }
}

/// One message captured by [`RecordingLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub indent: usize,
}

/// Logger that keeps every message in memory
///
/// Used by tests to assert on what the operator would have seen.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.level == level && entry.message.contains(needle))
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.level == level)
            .count()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, indent: usize) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                indent,
            });
        }
    }
}
