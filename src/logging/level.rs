//! Log verbosity levels shared between the host and the event loop.
//!
//! Levels carry the numeric codes the loop's logging registration uses:
//! 0 (panic) through 6 (trace). A record is emitted when its code is less
//! than or equal to the active threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MeshloopError;

/// Verbosity of a loop log record or threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Panic = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    #[default]
    Trace = 6,
}

impl LogLevel {
    /// Every level, least verbose first
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Panic,
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Numeric code of this level
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Level for a numeric code, if it is in range
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Lenient parse used for host-supplied level names.
    ///
    /// Unknown names fall back to `Info` and log a warning.
    pub fn parse(name: &str) -> Self {
        match name.parse() {
            Ok(level) => level,
            Err(_) => {
                log::warn!("level not recognized: {}. Using info", name);
                LogLevel::Info
            }
        }
    }

    /// Lowercase name of this level
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Whether a record at `level` passes this threshold
    pub fn allows(self, level: LogLevel) -> bool {
        level <= self
    }

    /// Equivalent level in the `log` facade
    pub fn to_log_level(self) -> log::Level {
        match self {
            LogLevel::Panic | LogLevel::Fatal | LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = MeshloopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(LogLevel::Panic),
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(MeshloopError::InvalidState(format!("unknown log level: {}", other))),
        }
    }
}
