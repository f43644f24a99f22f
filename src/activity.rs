//! Activity log collaborator.
//!
//! The loader reports progress through an injected `ActivityLog` instead of a
//! global. `TracingLog` forwards to `tracing`; `MemoryLog` additionally keeps a
//! timestamped history a front end can display.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Severity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// Sink for user-facing activity messages. Fire-and-forget.
pub trait ActivityLog: Send + Sync {
    fn add_log(&self, level: LogLevel, message: &str);
}

fn emit_tracing(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warning => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}

/// Forwards activity straight to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ActivityLog for TracingLog {
    fn add_log(&self, level: LogLevel, message: &str) {
        emit_tracing(level, message);
    }
}

/// A recorded activity entry
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

/// Keeps every entry in memory and forwards it to `tracing`
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries at `level` or above
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level >= level)
            .collect()
    }

    /// Whether any entry at `level` contains `needle`
    #[cfg(test)]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }
}

impl ActivityLog for MemoryLog {
    fn add_log(&self, level: LogLevel, message: &str) {
        emit_tracing(level, message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                timestamp: Local::now(),
            });
        }
    }
}
