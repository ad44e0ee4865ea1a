//! JSON Lines 로그 파서
//!
//! 한 줄에 JSON 객체 하나가 기록된 로그를 파싱합니다. 필드 이름 매핑을 통해
//! serilog, bunyan, pino 등 서로 다른 필드 이름을 쓰는 로그를 수용합니다.
//!
//! # 지원 형식
//! - 평탄(flat) JSON 객체
//! - 중첩(nested) JSON 객체 (dot notation으로 필드 접근)
//!
//! 매핑되지 않은 필드는 모두 평탄화하여 `custom_data`에 담습니다.

use chrono::{DateTime, Utc};
use logtide_core::config::DEFAULT_MAX_RECORD_SIZE;
use logtide_core::error::LogtideError;
use logtide_core::receiver::{Framing, MessageParser};
use logtide_core::types::{LogLevel, LogRecord};
use serde_json::Value;

use crate::error::TailError;

const FORMAT: &str = "json";

/// JSON 로그 필드 매핑 설정
///
/// 각 값은 dot notation 경로입니다 (예: `"meta.logger"`).
#[derive(Debug, Clone)]
pub struct JsonFieldMapping {
    /// 타임스탬프 필드 (기본: "timestamp")
    pub timestamp_field: String,
    /// 레벨 필드 (기본: "level")
    pub level_field: String,
    /// 로거 필드 (기본: "logger")
    pub logger_field: String,
    /// 스레드 필드 (기본: "thread")
    pub thread_field: String,
    /// 메시지 필드 (기본: "message")
    pub message_field: String,
}

impl Default for JsonFieldMapping {
    fn default() -> Self {
        Self {
            timestamp_field: "timestamp".to_owned(),
            level_field: "level".to_owned(),
            logger_field: "logger".to_owned(),
            thread_field: "thread".to_owned(),
            message_field: "message".to_owned(),
        }
    }
}

impl JsonFieldMapping {
    fn mapped_paths(&self) -> [&str; 5] {
        [
            self.timestamp_field.as_str(),
            self.level_field.as_str(),
            self.logger_field.as_str(),
            self.thread_field.as_str(),
            self.message_field.as_str(),
        ]
    }
}

/// JSON Lines 로그 파서
pub struct JsonLinesParser {
    /// 필드 매핑 설정
    mapping: JsonFieldMapping,
    /// 최대 허용 레코드 크기 (바이트)
    max_record_size: usize,
}

impl JsonLinesParser {
    /// 커스텀 필드 매핑으로 새 파서를 생성합니다.
    pub fn new(mapping: JsonFieldMapping) -> Self {
        Self {
            mapping,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
        }
    }

    /// 최대 레코드 크기를 설정합니다.
    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    /// dot notation 경로로 값을 찾습니다.
    fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
        path.split('.').try_fold(value, |current, part| current.get(part))
    }

    /// 스칼라 값을 문자열로 추출합니다.
    fn extract_string(value: &Value, path: &str) -> Option<String> {
        match Self::lookup(value, path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn parse_line(&self, raw: &str, sequence: u64) -> Result<LogRecord, TailError> {
        if raw.len() > self.max_record_size {
            return Err(TailError::TooLarge {
                size: raw.len(),
                max: self.max_record_size,
            });
        }

        let value: Value = serde_json::from_str(raw.trim()).map_err(|e| {
            TailError::parse(FORMAT, format!("{e} (column {})", e.column()))
        })?;

        if !value.is_object() {
            return Err(TailError::parse(FORMAT, "expected JSON object at top level"));
        }

        let timestamp = match Self::extract_string(&value, &self.mapping.timestamp_field) {
            Some(ts) => Self::parse_timestamp(&ts)?,
            None => Utc::now(),
        };

        // 알 수 없는 레벨 문자열은 Info로 취급
        let level = Self::extract_string(&value, &self.mapping.level_field)
            .and_then(|level| LogLevel::from_str_loose(&level))
            .unwrap_or_default();

        let logger = Self::extract_string(&value, &self.mapping.logger_field).unwrap_or_default();
        let thread = Self::extract_string(&value, &self.mapping.thread_field).unwrap_or_default();
        let message = Self::extract_string(&value, &self.mapping.message_field).unwrap_or_default();

        let mut custom_data = Vec::new();
        Self::flatten_object(&value, "", &self.mapping.mapped_paths(), &mut custom_data);

        Ok(LogRecord::new(sequence, level, timestamp, logger, message)
            .with_thread(thread)
            .with_custom_data(custom_data))
    }

    /// JSON 객체를 평탄화하여 dot notation 필드 목록에 추가합니다.
    ///
    /// 매핑된 경로는 제외하고, null 값은 건너뛰며, 배열은 JSON 문자열로 직렬화합니다.
    fn flatten_object(
        value: &Value,
        prefix: &str,
        exclude: &[&str],
        out: &mut Vec<(String, String)>,
    ) {
        let Some(obj) = value.as_object() else {
            return;
        };

        for (key, val) in obj {
            let field_name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if exclude.contains(&field_name.as_str()) {
                continue;
            }

            match val {
                Value::Object(_) => Self::flatten_object(val, &field_name, exclude, out),
                Value::Array(arr) => {
                    if let Ok(s) = serde_json::to_string(arr) {
                        out.push((field_name, s));
                    }
                }
                Value::Null => {}
                Value::String(s) => out.push((field_name, s.clone())),
                Value::Number(n) => out.push((field_name, n.to_string())),
                Value::Bool(b) => out.push((field_name, b.to_string())),
            }
        }
    }

    /// 타임스탬프 문자열을 파싱합니다.
    ///
    /// 지원 형식:
    /// - RFC 3339 (ISO 8601): `2024-01-15T12:00:00Z`
    /// - Unix timestamp (초): `1705320000`
    /// - Unix timestamp (밀리초): `1705320000000`
    fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, TailError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(ts_num) = timestamp.parse::<i64>() {
            // 10자리 초과는 밀리초로 판단
            let parsed = if ts_num > 9_999_999_999 {
                DateTime::from_timestamp_millis(ts_num)
            } else {
                DateTime::from_timestamp(ts_num, 0)
            };

            if let Some(dt) = parsed {
                return Ok(dt);
            }
        }

        Err(TailError::parse(
            FORMAT,
            format!("invalid timestamp format: '{timestamp}'"),
        ))
    }
}

impl Default for JsonLinesParser {
    fn default() -> Self {
        Self::new(JsonFieldMapping::default())
    }
}

impl MessageParser for JsonLinesParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn framing(&self) -> Framing {
        Framing::LineDelimited
    }

    fn sniff(&self, first_line: &str) -> bool {
        let trimmed = first_line.trim();
        trimmed.starts_with('{')
            && serde_json::from_str::<Value>(trimmed).is_ok_and(|value| value.is_object())
    }

    fn parse(&self, raw: &str, sequence: u64) -> Result<LogRecord, LogtideError> {
        self.parse_line(raw, sequence).map_err(LogtideError::from)
    }
}
