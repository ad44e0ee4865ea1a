//! `logtide tail` command handler

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use logtide_core::config::{LogtideConfig, ReceiverConfig};
use logtide_core::layout::{FileLayoutStore, LayoutStore, MemoryLayoutStore};
use logtide_core::receiver::LogReceiver;
use logtide_core::types::{DISPLAY_COLUMNS, LogRecord};
use logtide_receiver::{
    ChannelSink, DirectoryReceiver, FileReceiver, SourceConfig, SourceKind, resolve_format,
};

use crate::cli::TailArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, RecordView, parse_columns};

/// Execute the `tail` command.
///
/// Builds a receiver from the `[receiver]` section overridden by command-line
/// flags, then prints records until Ctrl-C or until the receiver stops.
pub async fn execute(
    args: TailArgs,
    mut config: LogtideConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    apply_overrides(&mut config.receiver, &args);
    if config.receiver.path.is_empty() {
        return Err(CliError::Config(
            "no log source given: pass PATH or set receiver.path".to_owned(),
        ));
    }

    let source = SourceConfig::from_core(&config.receiver)?;
    let format = resolve_format(&source).await?;
    let store = open_layout_store(&config.layout.store_path)?;
    info!(
        kind = %source.kind,
        path = %source.path.display(),
        format = %format,
        "resolved log source"
    );

    let (sink, batches) = ChannelSink::new();
    let session = Session {
        store: store.as_ref(),
        columns: args.columns.as_deref(),
        writer,
    };

    match source.kind {
        SourceKind::File => session.follow(FileReceiver::new(source, format), sink, batches).await,
        SourceKind::Directory => {
            let receiver = DirectoryReceiver::new(source, format)?;
            session.follow(receiver, sink, batches).await
        }
    }
}

/// Merge command-line flags into the configured receiver section.
fn apply_overrides(receiver: &mut ReceiverConfig, args: &TailArgs) {
    if let Some(path) = &args.path {
        receiver.path = path.to_string_lossy().into_owned();
    }
    if args.dir {
        receiver.kind = SourceKind::Directory.to_string();
    }
    if let Some(pattern) = &args.pattern {
        receiver.pattern = pattern.clone();
    }
    if let Some(format) = &args.format {
        receiver.format = format.clone();
    }
    if args.from_beginning {
        receiver.start_from_beginning = true;
    }
}

fn open_layout_store(store_path: &str) -> Result<Box<dyn LayoutStore>, CliError> {
    if store_path.is_empty() {
        return Ok(Box::new(MemoryLayoutStore::new()));
    }
    Ok(Box::new(FileLayoutStore::open(Path::new(store_path))?))
}

/// Column selection for one receiver: the `--columns` flag (saved for next
/// time), else the saved layout, else every display column.
fn resolve_columns(
    store: &dyn LayoutStore,
    receiver: &str,
    flag: Option<&str>,
) -> Result<Vec<&'static str>, CliError> {
    if let Some(spec) = flag {
        let columns = parse_columns(spec)?;
        if columns.is_empty() {
            return Err(CliError::Command("--columns must name at least one column".to_owned()));
        }
        store.save_layout(receiver, &columns.join(","))?;
        return Ok(columns);
    }

    match store.load_layout(receiver).map(|saved| parse_columns(&saved)) {
        Some(Ok(columns)) if !columns.is_empty() => Ok(columns),
        Some(_) => {
            warn!(receiver, "ignoring unreadable saved layout");
            Ok(DISPLAY_COLUMNS.to_vec())
        }
        None => Ok(DISPLAY_COLUMNS.to_vec()),
    }
}

struct Session<'a> {
    store: &'a dyn LayoutStore,
    columns: Option<&'a str>,
    writer: &'a OutputWriter,
}

impl Session<'_> {
    async fn follow<R: LogReceiver>(
        &self,
        mut receiver: R,
        sink: ChannelSink,
        mut batches: UnboundedReceiver<Vec<LogRecord>>,
    ) -> Result<(), CliError> {
        let description = receiver.description();
        let columns = resolve_columns(self.store, &description, self.columns)?;

        receiver.initialize(Arc::new(sink)).await?;
        info!(receiver = %description, "following log source, press Ctrl-C to stop");

        let result = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break Ok(());
                }
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        if let Err(e) = self.print(&batch, &columns) {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
            }
        };

        receiver.shutdown().await?;
        result
    }

    fn print(&self, batch: &[LogRecord], columns: &[&'static str]) -> Result<(), CliError> {
        for record in batch {
            self.writer.emit(&RecordView::new(record, columns))?;
        }
        Ok(())
    }
}
