//! `logtide config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logtide_core::config::LogtideConfig;
use logtide_receiver::SourceConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show`.
const SECTIONS: [&str; 3] = ["general", "receiver", "layout"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load the configuration and run both the core checks and the receiver's own
/// checks (regex syntax, non-empty path), reporting every failure.
async fn execute_validate(config_path: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = ?config_path, "validating configuration");

    let report = match load_config(config_path).await {
        Ok(loaded) => ConfigValidationReport {
            errors: receiver_errors(&loaded.config),
            source: loaded.source,
            valid: true,
        },
        Err(e) => ConfigValidationReport {
            source: config_source(config_path),
            valid: false,
            errors: vec![e.to_string()],
        },
    }
    .finish();

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Receiver-level problems the core validation cannot see.
///
/// An empty `receiver.path` is allowed in the file because `tail PATH` supplies it.
fn receiver_errors(config: &LogtideConfig) -> Vec<String> {
    if config.receiver.path.is_empty() {
        return Vec::new();
    }
    match SourceConfig::from_core(&config.receiver) {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    }
}

fn config_source(config_path: Option<&Path>) -> String {
    config_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| super::DEFAULT_CONFIG_PATH.to_owned())
}

/// Display the effective configuration, optionally a single section.
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = ?config_path, "loading configuration");

    let loaded = load_config(config_path).await?;
    let config = &loaded.config;

    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("receiver") => toml::to_string_pretty(&config.receiver),
        Some("layout") => toml::to_string_pretty(&config.layout),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {})",
                SECTIONS.join(", ")
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {e})"));

    let report = ConfigReport {
        source: loaded.source,
        section,
        config_toml,
    };
    writer.render(&report)?;

    Ok(())
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path, or `(defaults)`
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(section) = &self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl ConfigValidationReport {
    fn finish(mut self) -> Self {
        self.valid = self.valid && self.errors.is_empty();
        self
    }
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(payload: &dyn Render) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        payload
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_config_report_render_text_full_config() {
        let report = ConfigReport {
            source: "logtide.toml".to_owned(),
            section: None,
            config_toml: "[general]\nlog_level = \"info\"".to_owned(),
        };

        let output = render(&report);
        assert!(output.contains("Configuration (source: logtide.toml)"));
        assert!(output.contains("log_level"));
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        let report = ConfigReport {
            source: "/etc/logtide.toml".to_owned(),
            section: Some("receiver".to_owned()),
            config_toml: "kind = \"file\"".to_owned(),
        };

        let output = render(&report);
        assert!(output.contains("[receiver]"), "should show section name");
        assert!(output.contains("kind"), "should show config content");
    }

    #[test]
    fn test_config_report_json_skips_toml() {
        let report = ConfigReport {
            source: "logtide.toml".to_owned(),
            section: Some("layout".to_owned()),
            config_toml: "store_path = \"\"".to_owned(),
        };

        let parsed = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(parsed["source"].as_str(), Some("logtide.toml"));
        assert_eq!(parsed["section"].as_str(), Some("layout"));
        assert!(parsed.get("config_toml").is_none(), "config_toml should be skipped");
    }

    #[test]
    fn test_validation_report_valid() {
        let report = ConfigValidationReport {
            source: "logtide.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        }
        .finish();

        let output = render(&report);
        assert!(output.contains("VALID"));
        assert!(!output.contains("Error:"));
    }

    #[test]
    fn test_validation_report_errors_make_it_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: true,
            errors: vec!["regex error: unclosed group".to_owned()],
        }
        .finish();

        assert!(!report.valid);
        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("unclosed group"));
    }

    #[test]
    fn test_receiver_errors_empty_path_allowed() {
        assert!(receiver_errors(&LogtideConfig::default()).is_empty());
    }

    #[test]
    fn test_receiver_errors_reports_bad_pattern() {
        let mut config = LogtideConfig::default();
        config.receiver.kind = "directory".to_owned();
        config.receiver.path = "/var/log/app".to_owned();
        config.receiver.pattern = "(".to_owned();

        let errors = receiver_errors(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("regex"));
    }

    #[tokio::test]
    async fn test_show_unknown_section_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logtide.toml");
        std::fs::write(&path, "[general]\nlog_level = \"info\"\n").unwrap();

        let writer = OutputWriter::new(crate::cli::OutputFormat::Text);
        let err = execute_show(Some(&path), Some("metrics".to_owned()), &writer)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown section"));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_validate_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let writer = OutputWriter::new(crate::cli::OutputFormat::Text);
        let err = execute_validate(Some(&path), &writer).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
