//! 설정 관리 -- logtide.toml 파싱 및 런타임 설정
//!
//! [`LogtideConfig`]는 CLI와 수신기가 공유하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGTIDE_RECEIVER_PATH=/var/log/app.log` 형식)
//! 3. 설정 파일 (`logtide.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logtide_core::error::LogtideError> {
//! use logtide_core::config::LogtideConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogtideConfig::load("logtide.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogtideConfig::parse("[receiver]\nkind = \"directory\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogtideError};

/// 레코드 하나의 기본 최대 크기 (1 MiB)
pub const DEFAULT_MAX_RECORD_SIZE: usize = 1024 * 1024;

/// logtide 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogtideConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수신기 설정
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// 레이아웃 저장소 설정
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl LogtideConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogtideError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogtideError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogtideError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogtideError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogtideError> {
        toml::from_str(toml_str).map_err(|e| {
            LogtideError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGTIDE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGTIDE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGTIDE_GENERAL_LOG_FORMAT");

        // Receiver
        override_string(&mut self.receiver.kind, "LOGTIDE_RECEIVER_KIND");
        override_string(&mut self.receiver.path, "LOGTIDE_RECEIVER_PATH");
        override_string(&mut self.receiver.pattern, "LOGTIDE_RECEIVER_PATTERN");
        override_string(&mut self.receiver.format, "LOGTIDE_RECEIVER_FORMAT");
        override_bool(
            &mut self.receiver.start_from_beginning,
            "LOGTIDE_RECEIVER_START_FROM_BEGINNING",
        );
        override_usize(
            &mut self.receiver.channel_capacity,
            "LOGTIDE_RECEIVER_CHANNEL_CAPACITY",
        );
        override_u64(
            &mut self.receiver.resubscribe_delay_ms,
            "LOGTIDE_RECEIVER_RESUBSCRIBE_DELAY_MS",
        );
        override_usize(
            &mut self.receiver.max_record_size,
            "LOGTIDE_RECEIVER_MAX_RECORD_SIZE",
        );

        // Layout
        override_string(&mut self.layout.store_path, "LOGTIDE_LAYOUT_STORE_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 정규식 문법은 regex 크레이트가 있는 수신기 크레이트에서 검증합니다.
    pub fn validate(&self) -> Result<(), LogtideError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        let valid_kinds = ["file", "directory"];
        if !valid_kinds.contains(&self.receiver.kind.as_str()) {
            return Err(invalid(
                "receiver.kind",
                format!("must be one of: {}", valid_kinds.join(", ")),
            ));
        }

        let valid_record_formats = ["auto", "log4j", "syslog", "json"];
        if !valid_record_formats.contains(&self.receiver.format.as_str()) {
            return Err(invalid(
                "receiver.format",
                format!("must be one of: {}", valid_record_formats.join(", ")),
            ));
        }

        if self.receiver.kind == "directory" && self.receiver.pattern.is_empty() {
            return Err(invalid(
                "receiver.pattern",
                "pattern must not be empty for directory receivers".to_owned(),
            ));
        }

        if self.receiver.channel_capacity == 0 {
            return Err(invalid(
                "receiver.channel_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.receiver.max_record_size == 0 {
            return Err(invalid(
                "receiver.max_record_size",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LogtideError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 수신기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// 수신기 종류 (file, directory)
    pub kind: String,
    /// 감시 대상 파일 또는 디렉토리 경로
    pub path: String,
    /// 파일 이름 정규식 (directory 전용)
    pub pattern: String,
    /// 레코드 형식 (auto, log4j, syslog, json)
    pub format: String,
    /// 기존 내용을 처음부터 읽을지 여부
    pub start_from_beginning: bool,
    /// 파일 변경 알림 채널 용량
    pub channel_capacity: usize,
    /// 감시 실패 후 재구독까지 대기 시간 (밀리초)
    pub resubscribe_delay_ms: u64,
    /// 레코드 하나의 최대 크기 (바이트)
    pub max_record_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            kind: "file".to_owned(),
            path: String::new(),
            pattern: String::new(),
            format: "auto".to_owned(),
            start_from_beginning: false,
            channel_capacity: 256,
            resubscribe_delay_ms: 1000,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
        }
    }
}

/// 레이아웃 저장소 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// 레이아웃 JSON 파일 경로 (비어 있으면 메모리 저장소)
    pub store_path: String,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
