//! File-backed line sink.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{LineSink, bounded_lines};
use crate::error::Result;

/// Writes each dump line, newline-terminated, to a file.
pub struct FileLineSink {
    writer: BufWriter<File>,
    lines: usize,
}

impl FileLineSink {
    /// Create (or truncate) the file at `path`, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Flush buffered lines to disk
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl LineSink for FileLineSink {
    fn line(&mut self, line: &str) -> Result<()> {
        for piece in bounded_lines(line) {
            writeln!(self.writer, "{}", piece)?;
            self.lines += 1;
        }
        Ok(())
    }
}
