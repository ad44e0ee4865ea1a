//! 파일 시스템 변경 구독 (`notify`)
//!
//! `notify` 콜백 스레드에서 이벤트를 [`WatchSignal`]로 변환하여
//! bounded `mpsc` 채널에 `try_send`합니다. 채널이 가득 차면 알림을 버리는데,
//! 이미 대기 중인 읽기 패스가 새 바이트를 모두 가져가므로 합쳐진 것과 같습니다.
//!
//! 반환된 [`RecommendedWatcher`]가 구독 자체이며, drop되면 감시가 해제됩니다.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

use crate::error::TailError;

/// 파일 변경 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    /// 생성 또는 이 이름으로 이동해 옴
    Created,
    /// 내용 변경
    Modified,
    /// 삭제 또는 다른 이름으로 이동해 감
    Removed,
}

/// 경로 하나에 대한 변경
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileChange {
    pub(crate) kind: ChangeKind,
    pub(crate) path: PathBuf,
}

impl FileChange {
    /// 변경된 경로의 파일 이름이 `name`과 같은지 확인합니다.
    pub(crate) fn is_named(&self, name: &std::ffi::OsStr) -> bool {
        self.path.file_name() == Some(name)
    }
}

/// 감시 태스크로 전달되는 신호
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchSignal {
    /// 파일 변경 알림
    Changed(FileChange),
    /// 감시 메커니즘 오류 (재구독 필요)
    Failed(String),
    /// 이벤트 큐 넘침 등으로 개별 변경을 놓쳤음 (읽기 패스 필요)
    Rescan,
    /// 비활성 -> 활성 전환 (따라잡기 읽기)
    Resume,
}

/// `root`를 비재귀로 감시하는 구독을 생성합니다.
pub(crate) fn subscribe(
    root: &Path,
    tx: mpsc::Sender<WatchSignal>,
) -> Result<RecommendedWatcher, TailError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for signal in signals_for(event) {
                    forward(&tx, signal);
                }
            }
            Err(e) => forward(&tx, WatchSignal::Failed(e.to_string())),
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn forward(tx: &mpsc::Sender<WatchSignal>, signal: WatchSignal) {
    match tx.try_send(signal) {
        Ok(()) => {}
        Err(TrySendError::Full(signal)) => {
            trace!(?signal, "watch channel full, coalescing notification");
        }
        // 수신 측 종료 (구독 해제 중)
        Err(TrySendError::Closed(_)) => {}
    }
}

/// `notify` 이벤트를 worker 신호로 변환합니다.
///
/// 재스캔 플래그가 붙은 이벤트(inotify 큐 넘침)는 경로가 없으므로 [`WatchSignal::Rescan`] 하나가 됩니다.
pub(crate) fn signals_for(event: Event) -> Vec<WatchSignal> {
    if event.need_rescan() {
        return vec![WatchSignal::Rescan];
    }
    convert_event(event)
        .into_iter()
        .map(WatchSignal::Changed)
        .collect()
}

/// `notify` 이벤트를 경로별 변경 목록으로 변환합니다.
pub(crate) fn convert_event(event: Event) -> Vec<FileChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            let mut paths = event.paths.into_iter();
            let from = paths.next().map(|path| FileChange {
                kind: ChangeKind::Removed,
                path,
            });
            let to = paths.next().map(|path| FileChange {
                kind: ChangeKind::Created,
                path,
            });
            return from.into_iter().chain(to).collect();
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Created,
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| FileChange { kind, path })
        .collect()
}
