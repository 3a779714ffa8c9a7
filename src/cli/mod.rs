//! CLI layer for the chess copilot.
//!
//! Provides the command-line interface using clap, with commands for
//! managing sessions and asking the hosted services.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{TerminalSink, execute};
pub use output::OutputFormat;
pub use parser::{Cli, Commands, DEFAULT_SESSION, ServiceArgs};
