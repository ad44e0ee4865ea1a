//! Command handlers -- one module per subcommand

pub mod config;
pub mod detect;
pub mod tail;

use std::path::Path;

use logtide_core::config::LogtideConfig;
use tracing::debug;

use crate::error::CliError;

/// Configuration file picked up from the working directory when `--config` is omitted.
pub const DEFAULT_CONFIG_PATH: &str = "logtide.toml";

/// Effective configuration plus a label describing where it came from.
pub struct LoadedConfig {
    pub config: LogtideConfig,
    pub source: String,
}

/// Load the effective configuration.
///
/// An explicit `--config` path must exist. Without one, `logtide.toml` in the
/// working directory is used when present; otherwise defaults plus environment
/// overrides apply.
pub async fn load_config(path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Path::new(DEFAULT_CONFIG_PATH),
        None => {
            debug!("no configuration file, using defaults");
            let mut config = LogtideConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            return Ok(LoadedConfig {
                config,
                source: "(defaults)".to_owned(),
            });
        }
    };

    let config = LogtideConfig::load(path).await?;
    Ok(LoadedConfig {
        config,
        source: path.display().to_string(),
    })
}
