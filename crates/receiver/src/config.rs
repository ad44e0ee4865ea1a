//! 수신기 설정
//!
//! [`SourceConfig`]는 core의 [`ReceiverConfig`](logtide_core::config::ReceiverConfig)를
//! 타입이 있는 값으로 변환한 수신기 전용 설정입니다.
//!
//! # 사용 예시
//! ```
//! use logtide_core::config::LogtideConfig;
//! use logtide_receiver::config::SourceConfig;
//!
//! let mut core_config = LogtideConfig::default();
//! core_config.receiver.path = "/var/log/app/app.log".to_owned();
//! let config = SourceConfig::from_core(&core_config.receiver).unwrap();
//! assert!(config.format.is_none());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use logtide_core::config::{DEFAULT_MAX_RECORD_SIZE, ReceiverConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TailError;
use crate::parser::LogFormat;

/// 감시 대상 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 단일 파일
    #[default]
    File,
    /// 로테이션되는 파일들이 있는 디렉토리
    Directory,
}

impl SourceKind {
    /// 설정 문자열에서 종류를 파싱합니다.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "file" => Some(Self::File),
            "directory" | "dir" => Some(Self::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// 수신기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 감시 대상 종류
    pub kind: SourceKind,
    /// 파일 또는 디렉토리 경로
    pub path: PathBuf,
    /// 파일 이름 정규식 (디렉토리 전용, 경로가 아닌 파일 이름에 적용)
    pub pattern: String,
    /// 레코드 형식 (`None`이면 첫 줄로 자동 탐지)
    pub format: Option<LogFormat>,
    /// 기존 내용을 처음부터 읽을지 여부
    pub start_from_beginning: bool,
    /// 변경 알림 채널 용량
    pub channel_capacity: usize,
    /// 감시 실패 후 재구독 대기 시간 (밀리초)
    pub resubscribe_delay_ms: u64,
    /// 레코드 최대 크기 (바이트)
    pub max_record_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            path: PathBuf::new(),
            pattern: String::new(),
            format: None,
            start_from_beginning: false,
            channel_capacity: 256,
            resubscribe_delay_ms: 1000,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
        }
    }
}

impl SourceConfig {
    /// core의 `ReceiverConfig`에서 수신기 설정을 생성합니다.
    pub fn from_core(core: &ReceiverConfig) -> Result<Self, TailError> {
        let kind = SourceKind::from_name(&core.kind).ok_or_else(|| TailError::Config {
            field: "kind".to_owned(),
            reason: format!("unknown receiver kind '{}'", core.kind),
        })?;

        let format = if core.format.trim().eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(
                LogFormat::from_name(&core.format)
                    .ok_or_else(|| TailError::UnsupportedFormat(core.format.clone()))?,
            )
        };

        let config = Self {
            kind,
            path: PathBuf::from(&core.path),
            pattern: core.pattern.clone(),
            format,
            start_from_beginning: core.start_from_beginning,
            channel_capacity: core.channel_capacity,
            resubscribe_delay_ms: core.resubscribe_delay_ms,
            max_record_size: core.max_record_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// 재구독 대기 시간
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }

    /// 파일 이름 정규식을 컴파일합니다.
    pub fn compiled_pattern(&self) -> Result<Regex, TailError> {
        Ok(Regex::new(&self.pattern)?)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailError> {
        if self.path.as_os_str().is_empty() {
            return Err(TailError::Config {
                field: "path".to_owned(),
                reason: "source path must not be empty".to_owned(),
            });
        }

        if self.kind == SourceKind::Directory {
            if self.pattern.is_empty() {
                return Err(TailError::Config {
                    field: "pattern".to_owned(),
                    reason: "directory sources require a file name pattern".to_owned(),
                });
            }
            self.compiled_pattern()?;
        }

        if self.channel_capacity == 0 {
            return Err(TailError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_record_size == 0 {
            return Err(TailError::Config {
                field: "max_record_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 수신기 설정 빌더
#[derive(Default)]
pub struct SourceConfigBuilder {
    config: SourceConfig,
}

impl SourceConfigBuilder {
    /// 단일 파일 설정으로 시작합니다.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            config: SourceConfig {
                kind: SourceKind::File,
                path: path.into(),
                ..SourceConfig::default()
            },
        }
    }

    /// 디렉토리 설정으로 시작합니다.
    pub fn directory(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            config: SourceConfig {
                kind: SourceKind::Directory,
                path: path.into(),
                pattern: pattern.into(),
                ..SourceConfig::default()
            },
        }
    }

    /// 레코드 형식을 지정합니다.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = Some(format);
        self
    }

    /// 기존 내용을 처음부터 읽을지 설정합니다.
    pub fn start_from_beginning(mut self, enabled: bool) -> Self {
        self.config.start_from_beginning = enabled;
        self
    }

    /// 변경 알림 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 재구독 대기 시간(밀리초)을 설정합니다.
    pub fn resubscribe_delay_ms(mut self, millis: u64) -> Self {
        self.config.resubscribe_delay_ms = millis;
        self
    }

    /// 레코드 최대 크기를 설정합니다.
    pub fn max_record_size(mut self, size: usize) -> Self {
        self.config.max_record_size = size;
        self
    }

    /// 설정을 검증하고 `SourceConfig`를 생성합니다.
    pub fn build(self) -> Result<SourceConfig, TailError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
