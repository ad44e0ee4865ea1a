//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// logtide -- follow structured log files and rotating log directories.
///
/// Use `logtide <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logtide", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logtide.toml configuration file.
    ///
    /// When omitted, `logtide.toml` in the working directory is used if present,
    /// otherwise built-in defaults apply.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored text.
    Text,
    /// Machine-readable JSON (one object per record when tailing).
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a log file or rotating log directory until interrupted.
    Tail(TailArgs),

    /// Report which record formats recognise a file.
    Detect(DetectArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- tail ----

/// Follow a log source and print records as they arrive.
///
/// Flags override the `[receiver]` section of the configuration file.
#[derive(Args, Debug)]
pub struct TailArgs {
    /// File (or directory with `--dir`) to follow. Defaults to `receiver.path`.
    pub path: Option<PathBuf>,

    /// Treat PATH as a directory of rotated log files.
    #[arg(long)]
    pub dir: bool,

    /// File name regex selecting rotated files (directory sources only).
    #[arg(long)]
    pub pattern: Option<String>,

    /// Record format (auto, log4j, syslog, json).
    #[arg(short, long)]
    pub format: Option<String>,

    /// Read existing content (and rotated backlog) before following.
    #[arg(long)]
    pub from_beginning: bool,

    /// Comma-separated display columns; remembered per receiver in the layout store.
    ///
    /// Available: Number, Level, Timestamp, Logger, Thread, Message.
    #[arg(long)]
    pub columns: Option<String>,
}

// ---- detect ----

/// Sniff the first line of a file against every known format.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// File to inspect.
    pub path: PathBuf,
}

// ---- config ----

/// Manage logtide configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, receiver, layout).
        section: Option<String>,
    },
}
