//! 감시 소스 -- 단일 파일과 로테이션 디렉토리
//!
//! 두 소스는 같은 생명주기([`crate::lifecycle`])와 같은 읽기 패스([`tail`])를 공유하고,
//! 무엇을 감시하고 어떤 변경에 어떻게 반응하는지만 [`SourceTarget`]으로 다르게 정의합니다.
//!
//! ```text
//! notify 콜백 -> mpsc<WatchSignal> -> worker 태스크 -> TailState (Mutex) -> LogSink
//! ```

pub mod directory;
pub mod file;
pub(crate) mod tail;
pub(crate) mod watch;
pub(crate) mod worker;

pub use directory::DirectoryReceiver;
pub use file::FileReceiver;

use std::future::Future;
use std::path::Path;

use logtide_core::receiver::MessageParser;
use logtide_core::types::LogRecord;

use crate::config::{SourceConfig, SourceKind};
use crate::error::TailError;
use crate::parser::{LogFormat, detect_format, read_first_line};
use crate::sort::natural_sort;
use tail::TailState;
use watch::FileChange;

/// 소스 종류별 동작
///
/// 반환 future는 worker 태스크에서 실행되므로 `Send`여야 합니다.
pub(crate) trait SourceTarget: Send + Sync + 'static {
    /// 수신기 이름에 들어가는 종류 표기 (`File`, `Dir`)
    fn kind_label(&self) -> &'static str;

    /// 설명 괄호 안에 표시할 대상
    fn subject(&self) -> String;

    /// 구독할 디렉토리
    fn watch_root(&self) -> &Path;

    /// 이 소스가 관심 있는 경로인지 확인합니다.
    fn accepts(&self, path: &Path) -> bool;

    /// 대상 파일을 열고, 필요하면 백로그를 재생합니다.
    fn open(
        &self,
        tail: &mut TailState,
        from_beginning: bool,
    ) -> impl Future<Output = Result<Vec<LogRecord>, TailError>> + Send;

    /// 변경 알림 하나를 처리합니다.
    fn on_change(
        &self,
        tail: &mut TailState,
        change: &FileChange,
    ) -> impl Future<Output = Result<Vec<LogRecord>, TailError>> + Send;

    /// 읽기 전용 형식 확인
    fn probe(&self, parser: &dyn MessageParser) -> impl Future<Output = bool> + Send;
}

/// 파서 형식 이름을 화면 표기용 이름으로 바꿉니다.
pub(crate) fn format_label(format_name: &str) -> &str {
    match format_name {
        "log4j" => "Log4Net",
        "syslog" => "Syslog",
        "json" => "JSON Lines",
        other => other,
    }
}

/// 디렉토리에서 패턴에 맞는 파일을 찾아 자연 정렬합니다.
pub(crate) async fn scan_directory(
    dir: &Path,
    pattern: &regex::Regex,
) -> Result<Vec<std::path::PathBuf>, TailError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| TailError::SourceUnavailable {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.is_match(name));
        if matches && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    natural_sort(&mut files);
    Ok(files)
}

/// 설정의 형식을 결정합니다. 자동이면 대상의 첫 줄로 탐지합니다.
///
/// 디렉토리는 정렬 후 첫 번째(현재) 파일을 봅니다.
pub async fn resolve_format(config: &SourceConfig) -> Result<LogFormat, TailError> {
    if let Some(format) = config.format {
        return Ok(format);
    }

    let sample = match config.kind {
        SourceKind::File => config.path.clone(),
        SourceKind::Directory => {
            let pattern = config.compiled_pattern()?;
            scan_directory(&config.path, &pattern)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    TailError::UnsupportedFormat(format!(
                        "no file matching '{}' in {} to detect format from",
                        config.pattern,
                        config.path.display()
                    ))
                })?
        }
    };

    let first_line = read_first_line(&sample).await?;
    detect_format(&first_line).ok_or_else(|| {
        TailError::UnsupportedFormat(format!("could not detect format of {}", sample.display()))
    })
}
