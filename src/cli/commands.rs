//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: host the event loop until a deadline or Ctrl-C
//! - dump: write a diagnostic dump of a freshly started loop
//! - levels: list log levels and their codes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// meshloop - host an overlay client event loop on a dedicated thread
#[derive(Parser, Debug)]
#[command(name = "meshloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the event loop and keep it running
    Run {
        /// Stop after this many milliseconds instead of waiting for Ctrl-C
        #[arg(short, long)]
        duration_ms: Option<u64>,

        /// Override the loop log level (panic, fatal, error, warn, info, debug, trace)
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Dump loop diagnostics to a file
    Dump {
        /// Dump name; the file is <dump dir>/<name>.dump.txt
        #[arg(short, long, default_value = "meshloop")]
        name: String,
    },

    /// List log levels and their numeric codes
    Levels,
}
