//! 수신기 에러 타입
//!
//! [`TailError`]는 테일러 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<TailError> for LogtideError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logtide_core::error::{ConfigError, LogtideError, ParseError, ReceiverError};

/// 수신기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// 레코드 파싱 실패 (해당 레코드만 건너뜀)
    #[error("parse error: {format}: {reason}")]
    Parse {
        /// 파서 형식 (log4j, syslog, json)
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 레코드 최대 크기 초과
    #[error("record too large: {size} bytes (max: {max})")]
    TooLarge {
        /// 레코드 크기
        size: usize,
        /// 허용 최대 크기
        max: usize,
    },

    /// 지원하지 않는 로그 형식
    #[error("unsupported log format: {0}")]
    UnsupportedFormat(String),

    /// 대상 파일/디렉토리에 접근할 수 없음
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable {
        /// 대상 경로
        path: String,
        /// 사유
        reason: String,
    },

    /// 현재 생명주기 상태에서 허용되지 않는 호출
    #[error("operation '{operation}' not allowed in state {state}")]
    Lifecycle {
        /// 호출된 연산
        operation: String,
        /// 현재 상태
        state: String,
    },

    /// 감시 채널 에러
    #[error("watch error: {0}")]
    Watch(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// 파일 시스템 알림 에러
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

impl TailError {
    /// 형식 이름과 사유로 파싱 에러를 생성합니다.
    pub fn parse(format: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            format: format.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<TailError> for LogtideError {
    fn from(err: TailError) -> Self {
        match err {
            TailError::Parse { format, reason } => {
                LogtideError::Parse(ParseError::Malformed { format, reason })
            }
            TailError::TooLarge { size, max } => {
                LogtideError::Parse(ParseError::TooLarge { size, max })
            }
            TailError::UnsupportedFormat(name) => {
                LogtideError::Parse(ParseError::UnsupportedFormat(name))
            }
            TailError::SourceUnavailable { path, reason } => {
                LogtideError::Receiver(ReceiverError::SourceUnavailable { path, reason })
            }
            TailError::Lifecycle { operation, state } => {
                LogtideError::Receiver(ReceiverError::InvalidState { operation, state })
            }
            TailError::Watch(reason) => LogtideError::Receiver(ReceiverError::Watch(reason)),
            TailError::Notify(e) => LogtideError::Receiver(ReceiverError::Watch(e.to_string())),
            TailError::Config { field, reason } => {
                LogtideError::Config(ConfigError::InvalidValue { field, reason })
            }
            TailError::Regex(e) => LogtideError::Config(ConfigError::InvalidValue {
                field: "pattern".to_owned(),
                reason: e.to_string(),
            }),
            TailError::Io(e) => LogtideError::Io(e),
        }
    }
}
