//! 수신기 trait -- 모듈 확장 포인트 정의
//!
//! - [`LogSink`]: 수신기가 만든 레코드 배치를 받는 하위 소비자
//! - [`MessageParser`]: 프레이밍된 레코드 하나를 [`LogRecord`]로 변환
//! - [`LogReceiver`]: 파일/디렉토리 수신기가 공유하는 생명주기 계약

use std::fmt;
use std::sync::Arc;

use crate::error::LogtideError;
use crate::types::LogRecord;

/// 레코드 배치를 받는 싱크
///
/// 알림 처리 태스크 안에서 동기적으로 호출되므로 빠르게 반환해야 합니다
/// (큐에 넣고 즉시 반환하는 형태를 권장).
/// 한 수신기가 전달하는 배치는 배치 내부와 배치 사이 모두 `sequence` 순서를 지킵니다.
pub trait LogSink: Send + Sync {
    /// 레코드 배치를 처리합니다. 빈 배치는 전달되지 않습니다.
    fn handle_messages(&self, records: Vec<LogRecord>);
}

/// 원시 바이트 스트림을 레코드 경계로 나누는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// 고정된 종료 마커(예: XML 닫는 태그)까지를 한 레코드로 봅니다.
    TagDelimited {
        /// 레코드 종료 마커 (바이트 단위로 정확히 비교)
        end_marker: &'static str,
    },
    /// 물리적 한 줄이 한 레코드입니다.
    LineDelimited,
}

/// 로그 메시지 파서 trait
///
/// 새로운 로그 형식을 지원하려면 이 trait을 구현합니다.
/// 파서는 수신기 생성 시 한 번 선택되며 레코드마다 바뀌지 않습니다.
pub trait MessageParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 이 형식이 사용하는 프레이밍 방식
    fn framing(&self) -> Framing;

    /// 파일 첫 줄만 보고 이 형식인지 추정합니다.
    fn sniff(&self, first_line: &str) -> bool;

    /// 프레이밍된 레코드 하나를 파싱합니다.
    ///
    /// 실패는 해당 레코드만 건너뛰는 `MalformedRecord` 조건이며 치명적 에러가 아닙니다.
    fn parse(&self, raw: &str, sequence: u64) -> Result<LogRecord, LogtideError>;
}

/// 수신기 생명주기 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiverState {
    /// 아직 초기화되지 않음
    #[default]
    Uninitialized,
    /// 감시 중이며 레코드를 전달함
    Active,
    /// 감시는 유지하지만 전달을 멈춤
    Inactive,
    /// 종료 진행 중
    ShuttingDown,
    /// 종료됨 (다시 초기화 가능)
    Closed,
}

impl ReceiverState {
    /// 파일 시스템 구독이 살아 있어야 하는 상태인지 확인합니다.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Inactive | Self::ShuttingDown)
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// 로그 수신기 trait
///
/// 파일 수신기와 디렉토리 수신기가 같은 생명주기로 관리되도록 합니다.
#[allow(async_fn_in_trait)]
pub trait LogReceiver {
    /// 수신기 이름
    fn name(&self) -> &str;

    /// 감시 대상을 포함한 설명 (탭 제목 등에 사용)
    fn description(&self) -> String;

    /// 현재 생명주기 상태
    fn state(&self) -> ReceiverState;

    /// 감시를 시작하고 레코드를 `sink`로 전달합니다.
    async fn initialize(&mut self, sink: Arc<dyn LogSink>) -> Result<(), LogtideError>;

    /// 순번만 초기화합니다. 오프셋은 유지되어 이미 읽은 내용은 다시 읽지 않습니다.
    async fn clear(&self);

    /// `shutdown` 후 같은 설정으로 다시 `initialize` 합니다.
    async fn reset(&mut self) -> Result<(), LogtideError>;

    /// 감시를 해제하고 파일 핸들을 닫습니다. 여러 번 호출해도 안전합니다.
    async fn shutdown(&mut self) -> Result<(), LogtideError>;

    /// 레코드 전달이 활성화되어 있는지 확인합니다.
    fn is_active(&self) -> bool;

    /// 레코드 전달을 켜거나 끕니다. 파일 핸들과 오프셋은 그대로 유지됩니다.
    fn set_active(&mut self, active: bool);

    /// 상태를 바꾸지 않고 대상이 이 수신기로 처리 가능한지 가볍게 확인합니다.
    async fn can_handle_source(&self) -> bool;
}
