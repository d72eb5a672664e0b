//! Time and Logging Abstractions
//!
//! Injectable time source for cache timestamps, and a sink for forwarding
//! structured logs into the host's logging pipeline.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Time source trait
///
/// The cache stamps `cached_at` and `last_accessed_at` from this clock, so
/// tests can drive ordering deterministically.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn stamp(clock: &dyn Clock) -> i64 {
///     clock.unix_timestamp_millis()
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in seconds
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Get current Unix timestamp in milliseconds
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using actual system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Convert a stored Unix millisecond timestamp back into a UTC datetime.
///
/// Returns `None` for values outside chrono's representable range.
pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Logger sink trait
///
/// Forwards structured logs from the cache to the host logging pipeline
/// (console, file logs, or the platform's system logger).
///
/// Implementations should not log track payloads. Track ids and byte counts
/// are fine.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report_eviction(logger: &dyn LoggerSink, freed: u64) {
///     let entry = LogEntry::new(LogLevel::Info, "core_cache", "eviction pass finished")
///         .with_field("bytes_freed", freed.to_string());
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Get the minimum log level that will be processed
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Writes entries to stderr as one `key=value` line each. For development hosts.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

impl ConsoleLogger {
    /// Render `entry` on a single line, fields sorted by key.
    pub fn format_entry(entry: &LogEntry) -> String {
        let mut line = format!(
            "{} {:<5} {}: {}",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            entry.level.as_str(),
            entry.target,
            entry.message
        );

        let mut keys: Vec<&String> = entry.fields.keys().collect();
        keys.sort();
        for key in keys {
            line.push_str(&format!(" {}={}", key, entry.fields[key]));
        }

        line
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            eprintln!("{}", Self::format_entry(&entry));
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
