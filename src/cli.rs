// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `topoctl`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "topoctl",
    version,
    about = "Drive partition-scoped device topologies through their lifecycle.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Topoctl.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TOPOCTL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Partition id to send commands to. Repeatable; overrides `[cli].partitions`.
    #[arg(long = "partition", value_name = "ID")]
    pub partitions: Vec<String>,

    /// Request timeout, e.g. `30s`. Overrides `[config].timeout`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Run the commands given by `--cmds` (or `[cli].commands`) and exit.
    #[arg(long)]
    pub batch: bool,

    /// Batch command, e.g. `.run`. Repeatable.
    #[arg(long = "cmds", value_name = "CMD", num_args = 1..)]
    pub cmds: Vec<String>,

    /// Delay between batch commands, e.g. `500ms`. Overrides `[cli].delay`.
    #[arg(long, value_name = "DURATION")]
    pub delay: Option<String>,

    /// Reply format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Parse + validate the config, print it, but don't execute any request.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// How replies are printed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented `key: value` text.
    Text,
    /// Typed reply messages as JSON.
    Json,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
