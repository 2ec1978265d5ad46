//! Diagnostic dump - line-oriented state reports.
//!
//! A `DumpSource` writes its state one line at a time into a `LineSink`.
//! Sinks are provided for in-memory collection and for files.

mod file;

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;

pub use file::FileLineSink;

/// Longest line a dump produces, in bytes. Longer lines are truncated.
pub const MAX_LINE_BYTES: usize = 4095;

/// Consumer of dump output.
pub trait LineSink {
    fn line(&mut self, line: &str) -> Result<()>;
}

impl LineSink for Vec<String> {
    fn line(&mut self, line: &str) -> Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Anything that can describe its state as lines of text.
pub trait DumpSource {
    fn dump(&self, out: &mut dyn LineSink) -> Result<()>;
}

/// Cut `line` to at most `MAX_LINE_BYTES`, on a char boundary.
pub fn truncate_line(line: &str) -> &str {
    if line.len() <= MAX_LINE_BYTES {
        return line;
    }
    let mut end = MAX_LINE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Split `line` on embedded newlines and truncate each piece.
///
/// A single trailing newline does not start an extra line.
pub fn bounded_lines(line: &str) -> impl Iterator<Item = &str> {
    line.strip_suffix('\n')
        .unwrap_or(line)
        .split('\n')
        .map(|piece| truncate_line(piece.strip_suffix('\r').unwrap_or(piece)))
}

/// Forwards every line through `bounded_lines` before it reaches `inner`.
pub struct BoundedSink<'a> {
    inner: &'a mut dyn LineSink,
}

impl<'a> BoundedSink<'a> {
    pub fn new(inner: &'a mut dyn LineSink) -> Self {
        Self { inner }
    }
}

impl LineSink for BoundedSink<'_> {
    fn line(&mut self, line: &str) -> Result<()> {
        for piece in bounded_lines(line) {
            self.inner.line(piece)?;
        }
        Ok(())
    }
}

/// Collect a source's dump into memory
pub fn dump_to_lines(source: &dyn DumpSource) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    source.dump(&mut BoundedSink::new(&mut lines))?;
    Ok(lines)
}

/// Write a source's dump to `path`, preceded by a timestamped header.
///
/// Returns the number of lines written, header included.
pub fn dump_to_file(source: &dyn DumpSource, path: &Path) -> Result<usize> {
    let mut sink = FileLineSink::create(path)?;
    sink.line(&format!("meshloop dump generated at {}", Utc::now().to_rfc3339()))?;
    source.dump(&mut BoundedSink::new(&mut sink))?;
    let written = sink.lines_written();
    sink.finish()?;
    log::debug!("Wrote {} dump lines to {}", written, path.display());
    Ok(written)
}

/// Path of the dump file for `name` inside `dir`
pub fn dump_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.dump.txt", name))
}
