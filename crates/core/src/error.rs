//! 에러 타입 -- 도메인별 에러 정의

/// logtide 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogtideError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수신기 에러
    #[error("receiver error: {0}")]
    Receiver(#[from] ReceiverError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 수신기 에러
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// 대상 파일/디렉토리가 없거나 접근 불가
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// 현재 상태에서 허용되지 않는 호출
    #[error("operation '{operation}' not allowed in state {state}")]
    InvalidState { operation: String, state: String },

    /// 파일 시스템 감시 실패
    #[error("watch failed: {0}")]
    Watch(String),
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 레코드가 형식 문법에 맞지 않음
    #[error("malformed {format} record: {reason}")]
    Malformed { format: String, reason: String },

    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 입력 데이터 초과
    #[error("record too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

impl LogtideError {
    /// 레코드 하나만 건너뛰면 되는 파싱 실패인지 확인합니다.
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
