//! Log sinks and the level-filtered logger the event loop writes through.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};

use super::level::LogLevel;

/// A single log line produced by the event loop.
///
/// The message is formatted once, by the producer, before it reaches a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    /// Source location or subsystem that produced the record
    pub location: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(level: LogLevel, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            location: location.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for loop log records.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

impl<F> LogSink for F
where
    F: Fn(&LogRecord) + Send + Sync,
{
    fn write(&self, record: &LogRecord) {
        self(record)
    }
}

/// Forwards loop records into the `log` facade, using the location as target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn write(&self, record: &LogRecord) {
        log::log!(
            target: record.location.as_str(),
            record.level.to_log_level(),
            "{}",
            record.message
        );
    }
}

/// Level-filtered handle onto a sink. Cheap to clone; clones share the level.
#[derive(Clone)]
pub struct LoopLogger {
    level: Arc<AtomicU8>,
    sink: Arc<dyn LogSink>,
}

impl LoopLogger {
    pub fn new(sink: Arc<dyn LogSink>, level: LogLevel) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level.code())),
            sink,
        }
    }

    /// Current threshold
    pub fn level(&self) -> LogLevel {
        LogLevel::from_code(self.level.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Change the threshold; visible to every clone immediately
    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.code(), Ordering::Release);
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level().allows(level)
    }

    /// Format and emit a record if `level` passes the threshold.
    pub fn log(&self, level: LogLevel, location: &str, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord::new(level, location, args.to_string());
        self.sink.write(&record);
    }
}

impl Default for LoopLogger {
    fn default() -> Self {
        Self::new(Arc::new(LogCrateSink), LogLevel::default())
    }
}

impl fmt::Debug for LoopLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopLogger").field("level", &self.level()).finish()
    }
}
