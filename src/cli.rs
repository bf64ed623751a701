// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `script-docker`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "script-docker",
    version,
    about = "Run chat-supplied scripts in throwaway containers and stream their output back.",
    long_about = None
)]
pub struct CliArgs {
    /// Optional TOML config file. `LXBOT_*` environment variables override it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Handle a single message with this text instead of reading JSON lines
    /// from stdin.
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Print the command help text and exit.
    #[arg(long)]
    pub describe: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPT_DOCKER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
