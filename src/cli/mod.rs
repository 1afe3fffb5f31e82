//! Command-line interface for the provider.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
