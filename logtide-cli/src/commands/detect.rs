//! `logtide detect` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logtide_receiver::parser::{matching_formats, read_first_line};

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Longest first-line excerpt shown in the report.
const SAMPLE_CHARS: usize = 96;

/// Execute the `detect` command.
///
/// Reads only the first line of the file. Fails with exit code 1 when no
/// format recognises it and 3 when the file cannot be read.
pub async fn execute(args: DetectArgs, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %args.path.display(), "detecting log format");

    let first_line = read_first_line(&args.path).await?;
    let report = DetectReport::new(args.path.display().to_string(), &first_line);
    writer.render(&report)?;

    if report.detected.is_none() {
        return Err(CliError::Command(format!(
            "no known format recognises {}",
            report.path
        )));
    }
    Ok(())
}

/// Format detection report.
#[derive(Serialize)]
pub struct DetectReport {
    /// Inspected file
    pub path: String,
    /// Format `tail --format auto` would pick
    pub detected: Option<String>,
    /// Every format whose sniff accepted the first line, in detection order
    pub matches: Vec<String>,
    /// Start of the first line
    pub sample: String,
}

impl DetectReport {
    fn new(path: String, first_line: &str) -> Self {
        let matches: Vec<String> = matching_formats(first_line)
            .into_iter()
            .map(|format| format.name().to_owned())
            .collect();

        let mut sample: String = first_line.chars().take(SAMPLE_CHARS).collect();
        if first_line.chars().count() > SAMPLE_CHARS {
            sample.push_str("...");
        }

        Self {
            path,
            detected: matches.first().cloned(),
            matches,
            sample,
        }
    }
}

impl Render for DetectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Format Detection: {}", self.path.bold())?;
        match &self.detected {
            Some(format) => writeln!(w, "  Detected: {}", format.green().bold())?,
            None => writeln!(w, "  Detected: {}", "unknown".red().bold())?,
        }
        if self.matches.len() > 1 {
            writeln!(w, "  Also matches: {}", self.matches[1..].join(", "))?;
        }
        writeln!(w, "  First line: {}", self.sample.dimmed())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(report: &DetectReport) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_report_detects_syslog() {
        let report = DetectReport::new(
            "app.log".to_owned(),
            "<34>1 2024-01-15T12:00:00Z host app - - - started",
        );
        assert_eq!(report.detected.as_deref(), Some("syslog"));
        assert_eq!(report.matches, ["syslog"]);

        let output = render(&report);
        assert!(output.contains("Detected: syslog"));
        assert!(!output.contains("Also matches"));
    }

    #[test]
    fn test_report_detects_log4j() {
        let report = DetectReport::new(
            "app.xml".to_owned(),
            r#"<log4j:event logger="A" timestamp="0" level="INFO">"#,
        );
        assert_eq!(report.detected.as_deref(), Some("log4j"));
    }

    #[test]
    fn test_report_unknown_format() {
        let report = DetectReport::new("notes.txt".to_owned(), "just some words");
        assert!(report.detected.is_none());
        assert!(report.matches.is_empty());
        assert!(render(&report).contains("unknown"));
    }

    #[test]
    fn test_report_truncates_long_sample() {
        let line = format!("{{\"message\":\"{}\"}}", "x".repeat(300));
        let report = DetectReport::new("big.jsonl".to_owned(), &line);
        assert_eq!(report.detected.as_deref(), Some("json"));
        assert!(report.sample.ends_with("..."));
        assert_eq!(report.sample.chars().count(), SAMPLE_CHARS + 3);
    }

    #[test]
    fn test_report_json_shape() {
        let report = DetectReport::new("a.log".to_owned(), "{\"level\":\"info\"}");
        let json = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(json["detected"].as_str(), Some("json"));
        assert_eq!(json["matches"][0].as_str(), Some("json"));
    }
}
