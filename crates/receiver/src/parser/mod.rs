//! 로그 파싱 모듈 -- log4j XML, Syslog, JSON Lines 형식별 파서
//!
//! 각 파서는 core의 [`MessageParser`] trait을 구현합니다.
//! 파서는 수신기 생성 시 설정에 따라 한 번 선택되며, 레코드마다 바뀌지 않습니다.
//!
//! # 지원 형식
//! - log4j XML 이벤트 ([`Log4jXmlParser`], Log4Net/NLog 공용)
//! - Syslog RFC 5424 / RFC 3164 ([`SyslogParser`])
//! - JSON Lines ([`JsonLinesParser`])
//!
//! # 사용 예시
//! ```
//! use logtide_receiver::parser::{detect_format, LogFormat};
//!
//! let format = detect_format("<34>1 2024-01-15T12:00:00Z host sshd - - - hello");
//! assert_eq!(format, Some(LogFormat::Syslog));
//!
//! let parser = LogFormat::Syslog.build(1024 * 1024);
//! let record = parser.parse("<34>1 2024-01-15T12:00:00Z host sshd - - - hello", 1).unwrap();
//! assert_eq!(record.logger, "sshd");
//! ```

pub mod json;
pub mod log4j;
pub mod syslog;

pub use json::{JsonFieldMapping, JsonLinesParser};
pub use log4j::{LOG4J_END_MARKER, Log4jXmlParser};
pub use syslog::SyslogParser;

use std::fmt;
use std::path::Path;

use logtide_core::receiver::MessageParser;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use crate::error::TailError;

/// 첫 줄 탐지 시 읽는 최대 바이트 수
const SNIFF_LIMIT: u64 = 64 * 1024;

const UTF8_BOM: &str = "\u{feff}";

/// 지원하는 로그 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// log4j XML 이벤트
    Log4j,
    /// syslog 라인
    Syslog,
    /// JSON Lines
    Json,
}

impl LogFormat {
    /// 자동 탐지 순서대로 나열한 전체 형식
    pub const ALL: [LogFormat; 3] = [Self::Log4j, Self::Syslog, Self::Json];

    /// 설정/CLI에서 쓰는 형식 이름
    pub fn name(self) -> &'static str {
        match self {
            Self::Log4j => "log4j",
            Self::Syslog => "syslog",
            Self::Json => "json",
        }
    }

    /// 이름으로 형식을 찾습니다. `"auto"`는 형식이 아니므로 `None`입니다.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name.trim()))
    }

    /// 파서 인스턴스를 생성합니다.
    pub fn build(self, max_record_size: usize) -> Box<dyn MessageParser> {
        match self {
            Self::Log4j => Box::new(Log4jXmlParser::new().with_max_record_size(max_record_size)),
            Self::Syslog => Box::new(SyslogParser::new().with_max_record_size(max_record_size)),
            Self::Json => {
                Box::new(JsonLinesParser::default().with_max_record_size(max_record_size))
            }
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 첫 줄을 받아 들이는 첫 번째 형식을 반환합니다.
///
/// 탐지 순서는 [`LogFormat::ALL`]을 따릅니다.
pub fn detect_format(first_line: &str) -> Option<LogFormat> {
    matching_formats(first_line).into_iter().next()
}

/// 첫 줄을 받아 들이는 모든 형식을 탐지 순서대로 반환합니다.
pub fn matching_formats(first_line: &str) -> Vec<LogFormat> {
    LogFormat::ALL
        .into_iter()
        .filter(|format| format.build(usize::MAX).sniff(first_line))
        .collect()
}

/// 파일의 첫 줄을 읽습니다. 오프셋이나 수신기 상태를 건드리지 않습니다.
///
/// 앞쪽 [`SNIFF_LIMIT`] 바이트만 읽으며 UTF-8 BOM과 줄 끝 `\r`을 제거합니다.
/// 빈 파일이면 빈 문자열을 반환합니다.
pub async fn read_first_line(path: &Path) -> Result<String, TailError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TailError::SourceUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut head = Vec::new();
    file.take(SNIFF_LIMIT).read_to_end(&mut head).await?;

    let line_end = head
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(head.len());
    let line = String::from_utf8_lossy(&head[..line_end]);
    let line = line.strip_prefix(UTF8_BOM).unwrap_or(&line);

    Ok(line.trim_end_matches('\r').to_owned())
}
