//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Declarative management of Temporal namespaces.
#[derive(Parser, Debug)]
#[command(name = "temporal-provider")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest.
    #[arg(short, long, global = true, env = "TEMPORAL_PROVIDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the state file.
    #[arg(long, global = true, env = "TEMPORAL_PROVIDER_STATE")]
    pub state: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the manifest and provider settings without contacting Temporal.
    Validate,

    /// Print the provider and resource schemas.
    Schema,

    /// Show what apply would change.
    Plan {
        /// Plan against recorded state without re-reading it first.
        #[arg(long)]
        no_refresh: bool,
    },

    /// Converge Temporal to the manifest.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Plan against recorded state without re-reading it first.
        #[arg(long)]
        no_refresh: bool,
    },

    /// Read a namespace by managed name or remote identifier.
    Read {
        /// Managed namespace name, or a namespace id.
        name_or_id: String,
    },

    /// Bring an existing namespace under management.
    Import {
        /// Remote namespace identifier.
        id: String,
    },

    /// Delete every managed namespace.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect or edit recorded state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// List managed namespaces.
    List,

    /// Show the recorded attributes of one namespace.
    Show {
        /// Namespace name.
        name: String,
    },

    /// Stop managing a namespace without deleting it.
    Rm {
        /// Namespace name.
        name: String,
    },

    /// Remove a stale lock.
    Unlock {
        /// Remove the lock even if it has not expired.
        #[arg(long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Commands {
    /// Returns true if the command changes remote namespaces or state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        match self {
            Self::Apply { .. } | Self::Import { .. } | Self::Destroy { .. } | Self::Read { .. } => {
                true
            }
            Self::State { command } => matches!(command, StateCommands::Rm { .. }),
            Self::Validate | Self::Schema | Self::Plan { .. } => false,
        }
    }

    /// Returns true if the command talks to the Temporal frontend.
    #[must_use]
    pub const fn needs_connection(&self) -> bool {
        match self {
            Self::Plan { no_refresh } => !*no_refresh,
            Self::Apply { .. } | Self::Read { .. } | Self::Import { .. } | Self::Destroy { .. } => {
                true
            }
            Self::Validate | Self::Schema | Self::State { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["temporal-provider", "--output", "json", "apply", "-y"])
            .expect("parses");

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Apply { yes: true, no_refresh: false }));
        assert!(cli.command.is_mutating());
        assert!(cli.command.needs_connection());
    }

    #[test]
    fn test_plan_without_refresh_stays_offline() {
        let cli = Cli::try_parse_from(["temporal-provider", "plan", "--no-refresh"])
            .expect("parses");

        assert!(!cli.command.needs_connection());
        assert!(!cli.command.is_mutating());
    }

    #[test]
    fn test_state_rm_is_mutating() {
        let cli = Cli::try_parse_from(["temporal-provider", "state", "rm", "billing"])
            .expect("parses");

        assert!(cli.command.is_mutating());
        assert!(!cli.command.needs_connection());
    }
}
