//! 도메인 타입 -- 수신기와 소비자가 공유하는 정규화된 로그 모델
//!
//! 모든 파서는 형식에 관계없이 [`LogRecord`]를 생성하고,
//! 싱크(sink)는 이 타입만 알면 됩니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CSV 내보내기 헤더의 고정 컬럼 순서
pub const CSV_COLUMNS: [&str; 8] = [
    "Number",
    "Level",
    "Timestamp",
    "Logger",
    "Thread",
    "Message",
    "Location",
    "Custom Data",
];

/// 목록 화면에 표시되는 컬럼 (CSV 컬럼의 앞 6개)
pub const DISPLAY_COLUMNS: [&str; 6] = [
    "Number",
    "Level",
    "Timestamp",
    "Logger",
    "Thread",
    "Message",
];

/// CSV 내보내기 헤더 한 줄을 생성합니다.
///
/// 각 컬럼명은 큰따옴표로 감싸고 쉼표로 구분하며, 줄바꿈으로 끝납니다.
pub fn csv_header() -> String {
    let mut header = CSV_COLUMNS
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(",");
    header.push('\n');
    header
}

/// 로그 레벨
///
/// `Ord` 구현으로 비교가 가능합니다 (`Trace < Debug < Info < Warning < Error < Fatal`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LogLevel {
    /// 추적
    Trace,
    /// 디버그
    Debug,
    /// 정보
    #[default]
    Info,
    /// 경고
    Warning,
    /// 에러
    Error,
    /// 치명적
    Fatal,
}

impl LogLevel {
    /// 문자열에서 레벨을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며 log4j/NLog/syslog 계열의 별칭을 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" | "verbose" | "finest" | "finer" | "all" => Some(Self::Trace),
            "debug" | "fine" => Some(Self::Debug),
            "info" | "information" | "informational" | "notice" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warning),
            "error" | "err" | "severe" => Some(Self::Error),
            "fatal" | "critical" | "crit" | "alert" | "emergency" | "emerg" | "off" => {
                Some(Self::Fatal)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "Trace"),
            Self::Debug => write!(f, "Debug"),
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// 로그 발생 위치 (클래스, 메서드, 소스 파일, 라인)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// 클래스명
    pub class: String,
    /// 메서드명
    pub method: String,
    /// 소스 파일 경로
    pub file: String,
    /// 라인 번호
    pub line: Option<u32>,
}

impl Location {
    /// 모든 필드가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.class.is_empty() && self.method.is_empty() && self.file.is_empty() && self.line.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.class.is_empty(), self.method.is_empty()) {
            (false, false) => write!(f, "{}.{}", self.class, self.method)?,
            (false, true) => write!(f, "{}", self.class)?,
            (true, false) => write!(f, "{}", self.method)?,
            (true, true) => {}
        }

        if !self.file.is_empty() {
            match self.line {
                Some(line) => write!(f, " ({}:{})", self.file, line)?,
                None => write!(f, " ({})", self.file)?,
            }
        }

        Ok(())
    }
}

/// 로그 레코드
///
/// 파서가 생성하는 정규화된 로그 메시지입니다. 생성 이후에는 변경되지 않으며
/// 배치로 싱크에 전달된 뒤에는 싱크가 소유합니다.
///
/// `sequence`는 수신기 인스턴스 단위로 단조 증가하며, 파싱에 실패한
/// 레코드도 번호를 하나 소비하므로 중간에 빈 번호가 생길 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 수신 순번 (1부터 시작, Clear 시 재시작)
    pub sequence: u64,
    /// 레벨
    pub level: LogLevel,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 로거 이름
    pub logger: String,
    /// 스레드 식별자
    pub thread: String,
    /// 메시지 본문
    pub message: String,
    /// 발생 위치 (있을 경우)
    pub location: Option<Location>,
    /// 예외 정보 (있을 경우)
    pub exception: Option<String>,
    /// 형식별 추가 데이터 (key-value 쌍, 원본 순서 유지)
    pub custom_data: Vec<(String, String)>,
}

impl LogRecord {
    /// 필수 필드만으로 레코드를 생성합니다.
    pub fn new(
        sequence: u64,
        level: LogLevel,
        timestamp: DateTime<Utc>,
        logger: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            level,
            timestamp,
            logger: logger.into(),
            thread: String::new(),
            message: message.into(),
            location: None,
            exception: None,
            custom_data: Vec::new(),
        }
    }

    /// 스레드 식별자를 설정합니다.
    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    /// 발생 위치를 설정합니다. 비어 있는 위치는 무시합니다.
    pub fn with_location(mut self, location: Location) -> Self {
        if !location.is_empty() {
            self.location = Some(location);
        }
        self
    }

    /// 예외 정보를 설정합니다.
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        let exception = exception.into();
        if !exception.is_empty() {
            self.exception = Some(exception);
        }
        self
    }

    /// 추가 데이터 목록을 설정합니다.
    pub fn with_custom_data(mut self, data: Vec<(String, String)>) -> Self {
        self.custom_data = data;
        self
    }

    /// 추가 데이터에서 키로 값을 찾습니다.
    pub fn custom_value(&self, key: &str) -> Option<&str> {
        self.custom_data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.logger, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> LogRecord {
        let ts = Utc.timestamp_millis_opt(1_705_320_000_000).unwrap();
        LogRecord::new(1, LogLevel::Warning, ts, "App.Service", "disk almost full")
    }

    #[test]
    fn csv_header_matches_contract() {
        assert_eq!(
            csv_header(),
            "\"Number\",\"Level\",\"Timestamp\",\"Logger\",\"Thread\",\"Message\",\"Location\",\"Custom Data\"\n"
        );
    }

    #[test]
    fn display_columns_are_csv_prefix() {
        assert_eq!(&CSV_COLUMNS[..6], &DISPLAY_COLUMNS[..]);
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("WARN"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_str_loose("Information"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str_loose("FATAL"), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::from_str_loose(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
    }

    #[test]
    fn level_from_str_loose_log4net_extremes() {
        assert_eq!(LogLevel::from_str_loose("SEVERE"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str_loose("FINER"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("ALL"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("OFF"), Some(LogLevel::Fatal));
    }

    #[test]
    fn location_display() {
        let location = Location {
            class: "Demo.Program".to_owned(),
            method: "Main".to_owned(),
            file: "Program.cs".to_owned(),
            line: Some(42),
        };
        assert_eq!(location.to_string(), "Demo.Program.Main (Program.cs:42)");

        let bare = Location {
            class: "Demo.Program".to_owned(),
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "Demo.Program");
    }

    #[test]
    fn empty_location_is_dropped() {
        let record = sample_record().with_location(Location::default());
        assert!(record.location.is_none());
    }

    #[test]
    fn empty_exception_is_dropped() {
        let record = sample_record().with_exception("");
        assert!(record.exception.is_none());
    }

    #[test]
    fn record_display() {
        assert_eq!(
            sample_record().to_string(),
            "[Warning] App.Service: disk almost full"
        );
    }

    #[test]
    fn custom_value_lookup() {
        let record = sample_record().with_custom_data(vec![
            ("hostname".to_owned(), "web-01".to_owned()),
            ("facility".to_owned(), "auth".to_owned()),
        ]);
        assert_eq!(record.custom_value("facility"), Some("auth"));
        assert_eq!(record.custom_value("missing"), None);
    }

    #[test]
    fn record_serializes_to_json() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"sequence\":1"));
        assert!(json.contains("\"level\":\"Warning\""));
    }
}
