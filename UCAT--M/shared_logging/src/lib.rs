#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-lines logging for the drill crates.

use std::{
    fmt,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Recoverable anomalies (e.g. dropped catalog entries).
    Warn,
    /// Error indicator.
    Error,
}

impl LogLevel {
    /// Upper-case label as written to the log.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => bail!("unknown log level `{other}`"),
        }
    }
}

/// One structured log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Event name, dotted (`comprehension.quiz.scored`).
    pub message: String,
    /// Structured fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Adds a single metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Merges every key of a JSON object into the metadata. Non-objects are ignored.
    #[must_use]
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = fields {
            self.metadata.extend(map);
        }
        self
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Writes one record. Records below the sink's threshold are silently skipped.
    fn write(&self, record: &LogRecord) -> Result<()>;
}

/// Append-only JSON-lines file logger.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path, logging every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates or opens a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Writes a log record as a JSON line.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Minimum level this logger writes.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

impl LogSink for JsonLogger {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.log(record)
    }
}

/// In-memory sink, handy for asserting on emitted events.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages recorded so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }
}

impl LogSink for MemoryLogSink {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("nested/test.log")).unwrap();
        logger
            .log(&LogRecord::new("quiz", LogLevel::Info, "quiz.built").with_field("count", json!(3)))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"quiz.built\""));
        assert!(content.contains("\"count\":3"));
        assert!(content.contains("\"level\":\"INFO\""));
    }

    #[test]
    fn min_level_filters_records() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::with_min_level(dir.path().join("warn.log"), LogLevel::Warn).unwrap();
        logger
            .log(&LogRecord::new("quiz", LogLevel::Debug, "noisy"))
            .unwrap();
        logger
            .log(&LogRecord::new("quiz", LogLevel::Warn, "dropped"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(!content.contains("noisy"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn with_fields_merges_objects_only() {
        let record = LogRecord::new("m", LogLevel::Info, "x")
            .with_fields(json!({ "a": 1, "b": "two" }))
            .with_fields(json!([1, 2]));
        assert_eq!(record.metadata.len(), 2);
    }

    #[test]
    fn parses_levels() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" DEBUG ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error > LogLevel::Info);
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        sink.write(&LogRecord::new("m", LogLevel::Info, "first")).unwrap();
        sink.write(&LogRecord::new("m", LogLevel::Warn, "second")).unwrap();
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }
}
