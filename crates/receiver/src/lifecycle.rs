//! 수신기 생명주기 -- 모든 소스 종류가 공유하는 상태 머신
//!
//! ```text
//! Uninitialized --initialize--> Active <--set_active--> Inactive
//!        Active/Inactive --shutdown--> ShuttingDown --> Closed --initialize--> Active
//! ```
//!
//! - `initialize`: 대상 열기 -> 구독 -> 즉시 읽기 패스 -> worker 태스크 시작
//! - `shutdown`: worker 취소 후 종료 대기 (구독 해제) -> 파일 핸들 해제. 멱등
//! - `reset`: `shutdown` + 같은 싱크로 `initialize`
//! - `clear`: 순번만 초기화
//! - `set_active`: 전달만 켜고 끔. 핸들과 오프셋은 유지

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use logtide_core::receiver::{LogSink, MessageParser, ReceiverState};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::error::TailError;
use crate::source::SourceTarget;
use crate::source::tail::TailState;
use crate::source::watch::{self, WatchSignal};
use crate::source::worker::{Worker, deliver};
use crate::source::format_label;

/// 실행 중인 worker 태스크
struct RunningWorker {
    cancel: CancellationToken,
    signals: mpsc::Sender<WatchSignal>,
    handle: JoinHandle<()>,
}

/// 소스 종류에 무관한 수신기 본체
pub(crate) struct TailReceiver<T: SourceTarget> {
    name: String,
    config: SourceConfig,
    target: Arc<T>,
    tail: Arc<Mutex<TailState>>,
    active: Arc<AtomicBool>,
    state: ReceiverState,
    sink: Option<Arc<dyn LogSink>>,
    running: Option<RunningWorker>,
}

impl<T: SourceTarget> TailReceiver<T> {
    pub(crate) fn new(config: SourceConfig, target: T, parser: Box<dyn MessageParser>) -> Self {
        let name = format!(
            "{} {} Receiver",
            format_label(parser.format_name()),
            target.kind_label()
        );

        Self {
            name,
            config,
            target: Arc::new(target),
            tail: Arc::new(Mutex::new(TailState::new(parser))),
            active: Arc::new(AtomicBool::new(false)),
            state: ReceiverState::Uninitialized,
            sink: None,
            running: None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn description(&self) -> String {
        format!("{} ({})", self.name, self.target.subject())
    }

    pub(crate) fn state(&self) -> ReceiverState {
        self.state
    }

    pub(crate) fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub(crate) async fn initialize(&mut self, sink: Arc<dyn LogSink>) -> Result<(), TailError> {
        if self.state.is_live() {
            return Err(self.lifecycle_error("initialize"));
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let (watcher, delivered) = {
            let mut tail = self.tail.lock().await;
            let mut records = self
                .target
                .open(&mut tail, self.config.start_from_beginning)
                .await?;

            // 열기와 구독 사이에 추가된 내용까지 즉시 읽음
            let subscribed = watch::subscribe(self.target.watch_root(), tx.clone());
            let pass = match subscribed {
                Ok(watcher) => tail.read_pass().await.map(|pass| (watcher, pass)),
                Err(e) => Err(e),
            };
            let (watcher, pass) = match pass {
                Ok(subscribed) => subscribed,
                Err(e) => {
                    tail.close();
                    return Err(e);
                }
            };

            records.extend(pass);
            let delivered = records.len();
            deliver(sink.as_ref(), records);
            (watcher, delivered)
        };

        self.active.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let worker = Worker {
            target: Arc::clone(&self.target),
            tail: Arc::clone(&self.tail),
            active: Arc::clone(&self.active),
            sink: Arc::clone(&sink),
            signals: tx.clone(),
            resubscribe_delay: self.config.resubscribe_delay(),
            cancel: cancel.clone(),
            deferred: Vec::new(),
        };
        let handle = tokio::spawn(worker.run(rx, watcher));

        self.running = Some(RunningWorker {
            cancel,
            signals: tx,
            handle,
        });
        self.sink = Some(sink);
        self.state = ReceiverState::Active;

        info!(
            receiver = %self.name,
            path = %self.config.path.display(),
            initial_records = delivered,
            "receiver initialized"
        );
        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), TailError> {
        if !self.state.is_live() {
            return Ok(());
        }

        self.state = ReceiverState::ShuttingDown;
        self.active.store(false, Ordering::SeqCst);

        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                warn!(receiver = %self.name, error = %e, "watch worker terminated abnormally");
            }
        }

        self.tail.lock().await.close();
        self.state = ReceiverState::Closed;
        info!(receiver = %self.name, "receiver shut down");
        Ok(())
    }

    pub(crate) async fn reset(&mut self) -> Result<(), TailError> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| self.lifecycle_error("reset"))?;
        self.shutdown().await?;
        self.initialize(sink).await
    }

    pub(crate) async fn clear(&self) {
        self.tail.lock().await.clear_sequence();
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == ReceiverState::Active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        if !matches!(self.state, ReceiverState::Active | ReceiverState::Inactive) {
            return;
        }

        let was_active = self.active.swap(active, Ordering::SeqCst);
        self.state = if active {
            ReceiverState::Active
        } else {
            ReceiverState::Inactive
        };

        if active && !was_active {
            if let Some(running) = &self.running {
                // 가득 찼으면 worker가 다음 신호를 처리하기 전에 미뤄 둔 변경을 적용함
                let _ = running.signals.try_send(WatchSignal::Resume);
            }
        }
    }

    /// 읽기 패스를 즉시 한 번 수행합니다. 비활성 상태에서는 아무것도 읽지 않습니다.
    pub(crate) async fn refresh(&self) -> Result<(), TailError> {
        let Some(sink) = self.sink.as_ref().filter(|_| self.state.is_live()) else {
            return Err(self.lifecycle_error("refresh"));
        };
        if !self.active.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut tail = self.tail.lock().await;
        let records = tail.read_pass().await?;
        deliver(sink.as_ref(), records);
        Ok(())
    }

    pub(crate) async fn can_handle_source(&self) -> bool {
        let tail = self.tail.lock().await;
        self.target.probe(tail.parser()).await
    }

    /// 마지막으로 할당한 순번
    pub(crate) async fn last_sequence(&self) -> u64 {
        self.tail.lock().await.sequence()
    }

    fn lifecycle_error(&self, operation: &str) -> TailError {
        TailError::Lifecycle {
            operation: operation.to_owned(),
            state: self.state.to_string(),
        }
    }
}

/// `TailReceiver`를 감싼 공개 수신기에 `LogReceiver`를 위임 구현합니다.
macro_rules! delegate_log_receiver {
    ($receiver:ty) => {
        impl logtide_core::receiver::LogReceiver for $receiver {
            fn name(&self) -> &str {
                self.inner.name()
            }

            fn description(&self) -> String {
                self.inner.description()
            }

            fn state(&self) -> logtide_core::receiver::ReceiverState {
                self.inner.state()
            }

            async fn initialize(
                &mut self,
                sink: std::sync::Arc<dyn logtide_core::receiver::LogSink>,
            ) -> Result<(), logtide_core::error::LogtideError> {
                Ok(self.inner.initialize(sink).await?)
            }

            async fn clear(&self) {
                self.inner.clear().await
            }

            async fn reset(&mut self) -> Result<(), logtide_core::error::LogtideError> {
                Ok(self.inner.reset().await?)
            }

            async fn shutdown(&mut self) -> Result<(), logtide_core::error::LogtideError> {
                Ok(self.inner.shutdown().await?)
            }

            fn is_active(&self) -> bool {
                self.inner.is_active()
            }

            fn set_active(&mut self, active: bool) {
                self.inner.set_active(active)
            }

            async fn can_handle_source(&self) -> bool {
                self.inner.can_handle_source().await
            }
        }

        impl $receiver {
            /// 읽기 패스를 즉시 한 번 수행하고 결과를 싱크로 전달합니다.
            ///
            /// 수동 새로고침과 결정적인 테스트에 사용합니다.
            pub async fn refresh(&self) -> Result<(), logtide_core::error::LogtideError> {
                Ok(self.inner.refresh().await?)
            }

            /// 마지막으로 할당한 순번 (건너뛴 레코드 포함)
            pub async fn last_sequence(&self) -> u64 {
                self.inner.last_sequence().await
            }

            /// 수신기 설정
            pub fn config(&self) -> &crate::config::SourceConfig {
                self.inner.config()
            }
        }
    };
}

pub(crate) use delegate_log_receiver;
