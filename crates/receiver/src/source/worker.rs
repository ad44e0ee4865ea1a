//! 소스별 알림 처리 태스크
//!
//! 소스 하나당 태스크 하나가 신호 채널을 소비합니다. 읽기 패스는 테일 상태 락을
//! 잡은 채로 실행되고 싱크 전달도 락 안에서 일어나므로, 같은 소스의 패스는 겹치지 않고
//! 배치 간 순번은 감소하지 않습니다.
//!
//! 구독([`RecommendedWatcher`])은 태스크가 소유하며 태스크 종료 시 drop되어 해제됩니다.

use std::mem;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use logtide_core::metrics as m;
use logtide_core::receiver::LogSink;
use logtide_core::types::LogRecord;
use notify::RecommendedWatcher;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SourceTarget;
use super::tail::TailState;
use super::watch::{self, FileChange, WatchSignal};

/// 배치를 싱크로 전달합니다. 빈 배치는 전달하지 않습니다.
pub(crate) fn deliver(sink: &dyn LogSink, records: Vec<LogRecord>) {
    if records.is_empty() {
        return;
    }

    metrics::counter!(m::RECEIVER_BATCHES_DELIVERED_TOTAL).increment(1);
    debug!(
        count = records.len(),
        first_sequence = records[0].sequence,
        "delivering batch"
    );
    sink.handle_messages(records);
}

/// 알림 처리 태스크 상태
pub(crate) struct Worker<T: SourceTarget> {
    pub(crate) target: Arc<T>,
    pub(crate) tail: Arc<Mutex<TailState>>,
    pub(crate) active: Arc<AtomicBool>,
    pub(crate) sink: Arc<dyn LogSink>,
    /// 재구독 시 새 구독에 넘겨줄 송신 측
    pub(crate) signals: mpsc::Sender<WatchSignal>,
    pub(crate) resubscribe_delay: Duration,
    pub(crate) cancel: CancellationToken,
    /// 비활성 중 미뤄 둔 변경
    pub(crate) deferred: Vec<FileChange>,
}

impl<T: SourceTarget> Worker<T> {
    /// 취소될 때까지 신호를 처리합니다.
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::Receiver<WatchSignal>,
        watcher: RecommendedWatcher,
    ) {
        let root = self.target.watch_root().to_path_buf();
        let mut subscription = Some(watcher);
        debug!(root = %root.display(), "watch worker started");

        loop {
            let signal = tokio::select! {
                _ = self.cancel.cancelled() => break,
                signal = rx.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };

            // Resume 신호가 채널이 가득 차 버려졌어도 미뤄 둔 변경은 여기서 적용됨
            if self.is_active() && !self.deferred.is_empty() {
                self.flush_deferred().await;
            }

            match signal {
                WatchSignal::Failed(reason) => {
                    // 이전 구독을 먼저 해제
                    subscription = None;
                    match self.resubscribe(&root, &reason).await {
                        Some(watcher) => subscription = Some(watcher),
                        None => break,
                    }
                }
                WatchSignal::Changed(change) => self.on_change(change).await,
                WatchSignal::Rescan => self.on_rescan().await,
                WatchSignal::Resume => self.on_resume().await,
            }
        }

        drop(subscription);
        debug!(root = %root.display(), "watch worker stopped");
    }

    async fn on_change(&mut self, change: FileChange) {
        if !self.target.accepts(&change.path) {
            return;
        }
        if !self.is_active() {
            self.defer(change);
            return;
        }
        self.apply(&change).await;
    }

    /// 미뤄 둔 변경을 적용하고 따라잡기 읽기를 한 번 수행합니다.
    async fn on_resume(&mut self) {
        if !self.is_active() {
            return;
        }
        self.flush_deferred().await;
        self.read_pass().await;
    }

    /// 놓친 변경이 있으므로 현재 파일을 다시 읽습니다. 비활성이면 재개 시 읽음.
    async fn on_rescan(&self) {
        if !self.is_active() {
            return;
        }
        debug!("watch queue overflowed, rescanning");
        self.read_pass().await;
    }

    async fn flush_deferred(&mut self) {
        for change in mem::take(&mut self.deferred) {
            self.apply(&change).await;
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 중복 변경은 하나로 합쳐 마지막 위치에 둡니다.
    fn defer(&mut self, change: FileChange) {
        self.deferred.retain(|pending| pending != &change);
        self.deferred.push(change);
    }

    async fn apply(&self, change: &FileChange) {
        let mut tail = self.tail.lock().await;
        match self.target.on_change(&mut tail, change).await {
            Ok(records) => deliver(self.sink.as_ref(), records),
            Err(e) => warn!(
                path = %change.path.display(),
                error = %e,
                "failed to process file change"
            ),
        }
    }

    async fn read_pass(&self) {
        let mut tail = self.tail.lock().await;
        match tail.read_pass().await {
            Ok(records) => deliver(self.sink.as_ref(), records),
            Err(e) => warn!(error = %e, "read pass failed"),
        }
    }

    /// 성공할 때까지 구독을 다시 만든 뒤 읽기 패스를 한 번 수행합니다.
    ///
    /// 대기 중 취소되면 `None`을 반환합니다.
    async fn resubscribe(&self, root: &Path, reason: &str) -> Option<RecommendedWatcher> {
        metrics::counter!(m::RECEIVER_WATCH_FAILURES_TOTAL).increment(1);
        warn!(root = %root.display(), error = reason, "watch failed, re-subscribing");

        let watcher = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.resubscribe_delay) => {}
            }

            match watch::subscribe(root, self.signals.clone()) {
                Ok(watcher) => break watcher,
                Err(e) => warn!(
                    root = %root.display(),
                    error = %e,
                    delay_ms = self.resubscribe_delay.as_millis() as u64,
                    "re-subscribe failed, retrying"
                ),
            }
        };
        info!(root = %root.display(), "watch re-established");

        if self.is_active() {
            self.read_pass().await;
        }
        Some(watcher)
    }
}
