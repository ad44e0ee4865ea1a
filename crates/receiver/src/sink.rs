//! 채널 싱크 -- 레코드 배치를 tokio 채널로 넘기는 기본 [`LogSink`] 구현
//!
//! 알림 처리 태스크가 느린 소비자 때문에 막히지 않도록 무제한 채널을 사용합니다.

use logtide_core::receiver::LogSink;
use logtide_core::types::LogRecord;
use tokio::sync::mpsc;

/// 배치를 `mpsc::UnboundedSender`로 전달하는 싱크
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<LogRecord>>,
}

impl ChannelSink {
    /// 싱크와 배치 수신 채널을 생성합니다.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<LogRecord>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn handle_messages(&self, records: Vec<LogRecord>) {
        if self.tx.send(records).is_err() {
            tracing::debug!("sink receiver dropped, discarding batch");
        }
    }
}
