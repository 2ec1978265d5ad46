//! CLI module for meshloop - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
