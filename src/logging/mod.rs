//! Logging seam between the event loop and its host.
//!
//! The loop writes structured records through a `LoopLogger`, which applies
//! an adjustable level threshold before handing records to a `LogSink`.

mod level;
mod sink;

pub use level::LogLevel;
pub use sink::{LogCrateSink, LogRecord, LogSink, LoopLogger};
