//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! This keeps format-specific logic out of command handlers entirely.

use std::io::Write;

use colored::{ColoredString, Colorize};
use logtide_core::types::{DISPLAY_COLUMNS, LogLevel, LogRecord};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a one-off report to stdout (pretty JSON in JSON mode).
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        match self.format {
            OutputFormat::Text => payload.render_text(&mut handle)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut handle, payload)?;
                writeln!(handle)?;
            }
        }
        Ok(())
    }

    /// Render one item of a stream (compact JSON, one object per line).
    pub fn emit<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.emit_to(&mut handle, payload)?;
        handle.flush()?;
        Ok(())
    }

    fn emit_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => payload.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Parse a comma-separated column list against [`DISPLAY_COLUMNS`] (case-insensitive).
pub fn parse_columns(spec: &str) -> Result<Vec<&'static str>, CliError> {
    spec.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            DISPLAY_COLUMNS
                .iter()
                .copied()
                .find(|column| column.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    CliError::Command(format!(
                        "unknown column '{name}' (expected: {})",
                        DISPLAY_COLUMNS.join(", ")
                    ))
                })
        })
        .collect()
}

/// One tailed record as printed by `logtide tail`.
///
/// JSON output serialises the full record; text output prints the selected columns.
#[derive(Serialize)]
#[serde(transparent)]
pub struct RecordView<'a> {
    record: &'a LogRecord,
    #[serde(skip)]
    columns: &'a [&'static str],
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a LogRecord, columns: &'a [&'static str]) -> Self {
        Self { record, columns }
    }
}

fn colored_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<7}", level.to_string().to_uppercase());
    match level {
        LogLevel::Trace => label.dimmed(),
        LogLevel::Debug => label.blue(),
        LogLevel::Info => label.green(),
        LogLevel::Warning => label.yellow(),
        LogLevel::Error => label.red(),
        LogLevel::Fatal => label.red().bold(),
    }
}

impl Render for RecordView<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let record = self.record;
        let mut fields = Vec::with_capacity(self.columns.len());

        for column in self.columns {
            let field = match *column {
                "Number" => format!("#{}", record.sequence).dimmed().to_string(),
                "Level" => colored_level(record.level).to_string(),
                "Timestamp" => record
                    .timestamp
                    .format("%Y-%m-%d %H:%M:%S%.3f")
                    .to_string(),
                "Logger" => record.logger.cyan().to_string(),
                "Thread" if record.thread.is_empty() => continue,
                "Thread" => format!("[{}]", record.thread),
                "Message" => record.message.clone(),
                _ => continue,
            };
            fields.push(field);
        }
        writeln!(w, "{}", fields.join(" "))?;

        if let Some(exception) = &record.exception {
            for line in exception.lines() {
                writeln!(w, "    {}", line.red())?;
            }
        }
        Ok(())
    }
}
