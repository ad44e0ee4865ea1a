//! logtide CLI -- follow structured log files and rotating log directories.
//!
//! # Usage
//!
//! ```text
//! logtide tail /var/log/app.log --format log4j
//! logtide tail /var/log/app --dir --pattern '^app\.log(\.\d+)?$' --from-beginning
//! logtide detect /var/log/syslog
//! logtide config validate
//! logtide config show receiver
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use logtide_core::config::LogtideConfig;

use crate::cli::{Cli, Commands};
use crate::commands::LoadedConfig;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    if let Err(e) = run(cli, &writer).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    // `config validate` reports load failures itself, so fall back to defaults for logging.
    let loaded = match commands::load_config(cli.config.as_deref()).await {
        Ok(loaded) => Some(loaded),
        Err(e) if matches!(cli.command, Commands::Config(_)) => {
            init_logging(&LogtideConfig::default(), cli.log_level.as_deref())?;
            tracing::debug!(error = %e, "configuration did not load");
            None
        }
        Err(e) => return Err(e),
    };

    if let Some(LoadedConfig { config, source }) = &loaded {
        init_logging(config, cli.log_level.as_deref())?;
        tracing::debug!(source = %source, "configuration loaded");
    }
    logtide_core::metrics::describe_all();

    match cli.command {
        Commands::Tail(args) => {
            let config = loaded.map(|l| l.config).unwrap_or_default();
            commands::tail::execute(args, config, writer).await
        }
        Commands::Detect(args) => commands::detect::execute(args, writer).await,
        Commands::Config(args) => {
            commands::config::execute(args, cli.config.as_deref(), writer).await
        }
    }
}

fn init_logging(config: &LogtideConfig, level: Option<&str>) -> Result<(), CliError> {
    let level = level.unwrap_or(&config.general.log_level);
    logging::init_tracing(&config.general, level)
        .map_err(|e| CliError::Config(format!("failed to initialize logging: {e}")))
}
