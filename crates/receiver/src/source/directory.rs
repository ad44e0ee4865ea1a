//! 로테이션 디렉토리 수신기
//!
//! 디렉토리에서 패턴에 맞는 파일을 자연 정렬했을 때 첫 번째 파일이 현재 파일입니다.
//! (`app.log`, `app.log.1`, `app.log.2` ... 에서 `app.log`)
//!
//! 시작 시 처음부터 읽도록 설정되어 있으면 오래된 파일(`app.log.2` -> `app.log.1`)을
//! 먼저 재생한 뒤 현재 파일을 읽습니다.
//!
//! 로테이션은 두 가지 경우에만 전환합니다.
//! - 현재 파일과 같은 이름의 파일이 새로 생성됨
//! - 새로 생긴 파일이 정렬 결과의 첫 번째가 됨
//!
//! `app.log` -> `app.log.1` 이름 변경처럼 예전 내용이 다른 이름으로 옮겨 가는 경우는
//! 새 파일로 취급하지 않으므로 같은 내용을 두 번 읽지 않습니다.

use std::path::{Path, PathBuf};

use logtide_core::receiver::MessageParser;
use logtide_core::types::LogRecord;
use regex::Regex;
use tracing::{debug, info};

use super::tail::TailState;
use super::watch::{ChangeKind, FileChange};
use super::{SourceTarget, scan_directory};
use crate::config::SourceConfig;
use crate::error::TailError;
use crate::lifecycle::{TailReceiver, delegate_log_receiver};
use crate::parser::LogFormat;
use crate::sort::natural_sort;

/// 디렉토리 감시 대상
pub(crate) struct DirectoryTarget {
    dir: PathBuf,
    pattern: Regex,
}

impl DirectoryTarget {
    async fn candidates(&self) -> Result<Vec<PathBuf>, TailError> {
        scan_directory(&self.dir, &self.pattern).await
    }

    /// 현재 파일을 그대로 둔 채 새로 생긴 파일이 첫 번째가 되는지 확인합니다.
    async fn becomes_head(&self, current: &Path, change: &FileChange) -> Result<bool, TailError> {
        let mut candidates = self.candidates().await?;
        if !candidates.iter().any(|path| same_name(path, current)) {
            candidates.push(current.to_path_buf());
            natural_sort(&mut candidates);
        }

        Ok(candidates
            .first()
            .and_then(|head| head.file_name())
            .is_some_and(|name| change.is_named(name)))
    }
}

fn same_name(a: &Path, b: &Path) -> bool {
    a.file_name() == b.file_name()
}

impl SourceTarget for DirectoryTarget {
    fn kind_label(&self) -> &'static str {
        "Dir"
    }

    fn subject(&self) -> String {
        self.dir.display().to_string()
    }

    fn watch_root(&self) -> &Path {
        &self.dir
    }

    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.pattern.is_match(name))
    }

    async fn open(
        &self,
        tail: &mut TailState,
        from_beginning: bool,
    ) -> Result<Vec<LogRecord>, TailError> {
        let files = self.candidates().await?;
        let Some((head, backlog)) = files.split_first() else {
            info!(dir = %self.dir.display(), "no matching log file yet, waiting for one");
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        if from_beginning {
            for path in backlog.iter().rev() {
                records.extend(tail.replay(path).await?);
            }
        }
        tail.open(head, from_beginning).await?;
        Ok(records)
    }

    async fn on_change(
        &self,
        tail: &mut TailState,
        change: &FileChange,
    ) -> Result<Vec<LogRecord>, TailError> {
        let Some(current) = tail.current_path().map(Path::to_path_buf) else {
            if change.kind == ChangeKind::Removed {
                return Ok(Vec::new());
            }
            info!(path = %change.path.display(), "adopting new log file");
            tail.open(&change.path, true).await?;
            return tail.read_pass().await;
        };

        match change.kind {
            ChangeKind::Modified if same_name(&current, &change.path) => tail.read_pass().await,
            ChangeKind::Modified | ChangeKind::Removed => Ok(Vec::new()),
            ChangeKind::Created if same_name(&current, &change.path) => {
                info!(path = %change.path.display(), "log file recreated, reading from start");
                tail.switch_to(&change.path).await
            }
            ChangeKind::Created => {
                if self.becomes_head(&current, change).await? {
                    info!(
                        from = %current.display(),
                        to = %change.path.display(),
                        "log rotated to new file"
                    );
                    tail.switch_to(&change.path).await
                } else {
                    debug!(path = %change.path.display(), "ignoring older rotated file");
                    Ok(Vec::new())
                }
            }
        }
    }

    async fn probe(&self, _parser: &dyn MessageParser) -> bool {
        tokio::fs::metadata(&self.dir)
            .await
            .is_ok_and(|meta| meta.is_dir())
    }
}

/// 로테이션 디렉토리 수신기
pub struct DirectoryReceiver {
    inner: TailReceiver<DirectoryTarget>,
}

impl DirectoryReceiver {
    /// 형식을 지정하여 수신기를 생성합니다. 파일 이름 패턴이 잘못되면 실패합니다.
    pub fn new(config: SourceConfig, format: LogFormat) -> Result<Self, TailError> {
        let parser = format.build(config.max_record_size);
        Self::with_parser(config, parser)
    }

    pub fn with_parser(
        config: SourceConfig,
        parser: Box<dyn MessageParser>,
    ) -> Result<Self, TailError> {
        let target = DirectoryTarget {
            dir: config.path.clone(),
            pattern: config.compiled_pattern()?,
        };
        Ok(Self {
            inner: TailReceiver::new(config, target, parser),
        })
    }
}

delegate_log_receiver!(DirectoryReceiver);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfigBuilder;
    use crate::parser::SyslogParser;
    use std::fs;

    fn target(dir: &Path) -> DirectoryTarget {
        DirectoryTarget {
            dir: dir.to_path_buf(),
            pattern: Regex::new(r"^app\.log(\.\d+)?$").unwrap(),
        }
    }

    fn state() -> TailState {
        TailState::new(Box::new(SyslogParser::new()))
    }

    fn line(msg: &str) -> String {
        format!("<14>Jan 15 12:00:00 host app: {msg}\n")
    }

    fn created(path: PathBuf) -> FileChange {
        FileChange {
            kind: ChangeKind::Created,
            path,
        }
    }

    fn messages(records: &[LogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.message.as_str()).collect()
    }

    #[test]
    fn accepts_matches_file_name_only() {
        let target = target(Path::new("/var/log/app"));
        assert!(target.accepts(Path::new("/var/log/app/app.log")));
        assert!(target.accepts(Path::new("/var/log/app/app.log.3")));
        assert!(!target.accepts(Path::new("/var/log/app/other.log")));
    }

    #[tokio::test]
    async fn open_replays_backlog_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.2"), line("oldest")).unwrap();
        fs::write(dir.path().join("app.log.1"), line("older")).unwrap();
        fs::write(dir.path().join("app.log"), line("current")).unwrap();

        let target = target(dir.path());
        let mut tail = state();
        let mut records = target.open(&mut tail, true).await.unwrap();
        records.extend(tail.read_pass().await.unwrap());

        assert_eq!(messages(&records), ["oldest", "older", "current"]);
        assert_eq!(tail.current_path(), Some(dir.path().join("app.log").as_path()));
    }

    #[tokio::test]
    async fn open_from_end_skips_backlog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.1"), line("older")).unwrap();
        fs::write(dir.path().join("app.log"), line("current")).unwrap();

        let target = target(dir.path());
        let mut tail = state();
        let records = target.open(&mut tail, false).await.unwrap();
        assert!(records.is_empty());
        assert!(tail.read_pass().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_directory_adopts_first_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        let mut tail = state();
        assert!(target.open(&mut tail, true).await.unwrap().is_empty());
        assert!(tail.current_path().is_none());

        let path = dir.path().join("app.log");
        fs::write(&path, line("first")).unwrap();
        let records = target.on_change(&mut tail, &created(path)).await.unwrap();
        assert_eq!(messages(&records), ["first"]);
    }

    #[tokio::test]
    async fn rename_rotation_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("app.log");
        fs::write(&current, line("before")).unwrap();

        let target = target(dir.path());
        let mut tail = state();
        target.open(&mut tail, true).await.unwrap();
        assert_eq!(messages(&tail.read_pass().await.unwrap()), ["before"]);

        // app.log -> app.log.1 이동 후 새 app.log 생성
        let rotated = dir.path().join("app.log.1");
        fs::rename(&current, &rotated).unwrap();
        let records = target.on_change(&mut tail, &created(rotated)).await.unwrap();
        assert!(records.is_empty());

        fs::write(&current, line("after")).unwrap();
        let records = target.on_change(&mut tail, &created(current)).await.unwrap();
        assert_eq!(messages(&records), ["after"]);
    }

    #[tokio::test]
    async fn modified_other_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "").unwrap();
        fs::write(dir.path().join("app.log.1"), line("old")).unwrap();

        let target = target(dir.path());
        let mut tail = state();
        target.open(&mut tail, false).await.unwrap();

        let change = FileChange {
            kind: ChangeKind::Modified,
            path: dir.path().join("app.log.1"),
        };
        assert!(target.on_change(&mut tail, &change).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn probe_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let parser = SyslogParser::new();
        assert!(target(dir.path()).probe(&parser).await);
        assert!(!target(&dir.path().join("missing")).probe(&parser).await);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut config = SourceConfigBuilder::directory("/var/log/app", r"^app\.log$")
            .build()
            .unwrap();
        config.pattern = "(".to_owned();
        assert!(DirectoryReceiver::new(config, LogFormat::Syslog).is_err());
    }

    #[test]
    fn description_names_directory() {
        let config = SourceConfigBuilder::directory("/var/log/app", r"^app\.log")
            .build()
            .unwrap();
        let receiver = DirectoryReceiver::new(config, LogFormat::Json).unwrap();
        assert_eq!(
            logtide_core::receiver::LogReceiver::description(&receiver),
            "JSON Lines Dir Receiver (/var/log/app)"
        );
    }
}
