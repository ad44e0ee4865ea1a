//! 단일 파일 수신기
//!
//! 파일의 부모 디렉토리를 비재귀로 감시하고 파일 이름으로 알림을 거릅니다.
//! 디렉토리를 감시하므로 같은 이름으로 파일이 다시 만들어져도 알 수 있습니다.
//!
//! | 알림 | 동작 |
//! |------|------|
//! | 생성 | 이전 핸들을 마저 읽은 뒤 새 파일을 오프셋 0부터 읽음 |
//! | 변경 | 읽기 패스 |
//! | 삭제 | 무시 (다시 생성되기를 기다림) |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use logtide_core::receiver::MessageParser;
use logtide_core::types::LogRecord;
use tracing::{debug, info};

use super::SourceTarget;
use super::tail::TailState;
use super::watch::{ChangeKind, FileChange};
use crate::config::SourceConfig;
use crate::error::TailError;
use crate::lifecycle::{TailReceiver, delegate_log_receiver};
use crate::parser::{LogFormat, read_first_line};

/// 단일 파일 감시 대상
pub(crate) struct FileTarget {
    path: PathBuf,
    root: PathBuf,
    name: OsString,
}

impl FileTarget {
    pub(crate) fn new(path: &Path) -> Self {
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            path: path.to_path_buf(),
            root,
            name: path.file_name().map(OsString::from).unwrap_or_default(),
        }
    }
}

impl SourceTarget for FileTarget {
    fn kind_label(&self) -> &'static str {
        "File"
    }

    fn subject(&self) -> String {
        if self.name.is_empty() {
            "-".to_owned()
        } else {
            self.name.to_string_lossy().into_owned()
        }
    }

    fn watch_root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.file_name() == Some(self.name.as_os_str())
    }

    async fn open(
        &self,
        tail: &mut TailState,
        from_beginning: bool,
    ) -> Result<Vec<LogRecord>, TailError> {
        tail.open(&self.path, from_beginning).await?;
        Ok(Vec::new())
    }

    async fn on_change(
        &self,
        tail: &mut TailState,
        change: &FileChange,
    ) -> Result<Vec<LogRecord>, TailError> {
        match change.kind {
            ChangeKind::Created => {
                info!(path = %self.path.display(), "log file recreated, reading from start");
                tail.switch_to(&self.path).await
            }
            ChangeKind::Modified if tail.current_path().is_none() => {
                tail.open(&self.path, true).await?;
                tail.read_pass().await
            }
            ChangeKind::Modified => tail.read_pass().await,
            ChangeKind::Removed => {
                debug!(path = %self.path.display(), "log file removed, waiting for it to reappear");
                Ok(Vec::new())
            }
        }
    }

    async fn probe(&self, parser: &dyn MessageParser) -> bool {
        match read_first_line(&self.path).await {
            Ok(line) => parser.sniff(&line),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "source probe failed");
                false
            }
        }
    }
}

/// 단일 로그 파일 수신기
///
/// # 사용 예시
/// ```no_run
/// use std::sync::Arc;
/// use logtide_core::receiver::LogReceiver;
/// use logtide_receiver::config::SourceConfigBuilder;
/// use logtide_receiver::parser::LogFormat;
/// use logtide_receiver::{ChannelSink, FileReceiver};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SourceConfigBuilder::file("/var/log/app/app.log").build()?;
/// let mut receiver = FileReceiver::new(config, LogFormat::Log4j);
/// assert_eq!(receiver.description(), "Log4Net File Receiver (app.log)");
///
/// let (sink, mut batches) = ChannelSink::new();
/// receiver.initialize(Arc::new(sink)).await?;
/// while let Some(batch) = batches.recv().await {
///     for record in batch {
///         println!("{record}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileReceiver {
    inner: TailReceiver<FileTarget>,
}

impl FileReceiver {
    /// 형식을 지정하여 수신기를 생성합니다.
    pub fn new(config: SourceConfig, format: LogFormat) -> Self {
        let parser = format.build(config.max_record_size);
        Self::with_parser(config, parser)
    }

    /// 직접 만든 파서로 수신기를 생성합니다.
    pub fn with_parser(config: SourceConfig, parser: Box<dyn MessageParser>) -> Self {
        let target = FileTarget::new(&config.path);
        Self {
            inner: TailReceiver::new(config, target, parser),
        }
    }
}

delegate_log_receiver!(FileReceiver);
