//! Log Sink
//!
//! Structured log output used by the bus and the logging handler.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A structured log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attach a structured field
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Look up a field value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Fields as a JSON object
    pub fn fields_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(key, value)| (key.to_string(), serde_json::Value::String(value.clone())))
                .collect(),
        )
    }
}

/// Destination for structured log records. Emitting never fails.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Forwards records to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, record: LogRecord) {
        let fields = record.fields_json();
        match record.level {
            LogLevel::Debug => tracing::debug!(fields = %fields, "{}", record.message),
            LogLevel::Info => tracing::info!(fields = %fields, "{}", record.message),
            LogLevel::Warn => tracing::warn!(fields = %fields, "{}", record.message),
            LogLevel::Error => tracing::error!(fields = %fields, "{}", record.message),
        }
    }
}

/// Captures records in memory
#[derive(Debug, Default)]
pub struct InMemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl InMemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records with the given message
    pub fn with_message(&self, message: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.message == message)
            .cloned()
            .collect()
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for InMemoryLogSink {
    fn emit(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}
