//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

/// Content Planner - turn a subject into curated content ideas
#[derive(Parser)]
#[command(
    name = "cplan",
    about = "Iterative question/answer sessions that turn a subject into curated content ideas",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Session file, overriding session.output-file
    #[arg(short, long, global = true, help = "Session file (overrides session.output-file)")]
    pub output: Option<PathBuf>,

    /// Subcommand to execute (defaults to run)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start or resume an interactive session
    Run,

    /// Show the saved session's progress
    Status {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the saved session's accepted ideas
    Ideas {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for inspection commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where the log file is written
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contentplanner")
        .join("logs")
        .join("contentplanner.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Help footer naming the log file
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
