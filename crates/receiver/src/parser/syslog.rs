//! Syslog 파서 (RFC 5424, RFC 3164 최선 노력)
//!
//! 한 줄에 메시지 하나가 기록된 syslog 파일을 파싱합니다.
//!
//! # RFC 5424 메시지 형식
//! ```text
//! <PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG
//! ```
//!
//! # RFC 3164 메시지 형식
//! ```text
//! <PRI>MMM DD HH:MM:SS HOSTNAME TAG[PID]: MSG
//! ```
//!
//! # 필드 매핑
//! - severity → 레벨 (0-2 Fatal, 3 Error, 4 Warning, 5-6 Info, 7 Debug)
//! - APP-NAME / TAG → logger
//! - PROCID / `[PID]` → thread
//! - hostname, facility, msgid, structured data → custom_data

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use logtide_core::config::DEFAULT_MAX_RECORD_SIZE;
use logtide_core::error::LogtideError;
use logtide_core::receiver::{Framing, MessageParser};
use logtide_core::types::{LogLevel, LogRecord};

use crate::error::TailError;

/// RFC 5424에서 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
const MAX_SYSLOG_PRI: u8 = 191;

const FORMAT: &str = "syslog";

/// facility 코드별 이름 (RFC 5424 Section 6.2.1)
const FACILITY_NAMES: [&str; 24] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news", "uucp", "cron", "authpriv",
    "ftp", "ntp", "security", "console", "solaris-cron", "local0", "local1", "local2", "local3",
    "local4", "local5", "local6", "local7",
];

/// PRI 이후 본문에서 추출한 필드
#[derive(Debug, Default)]
struct SyslogBody {
    timestamp: Option<DateTime<Utc>>,
    hostname: String,
    app_name: String,
    proc_id: String,
    msg_id: String,
    message: String,
    structured: Vec<(String, String)>,
}

/// Syslog 파서
///
/// ## 지원 기능
/// - PRI 필드에서 facility/severity 디코딩
/// - RFC 3339 타임스탬프 파싱 (잘못된 값은 파싱 실패)
/// - Structured Data (SD) 추출
/// - NILVALUE (`-`) 처리
/// - RFC 3164 형식 최선 노력 파싱 (연도는 현재 연도로 가정)
pub struct SyslogParser {
    /// 최대 허용 레코드 크기 (바이트)
    max_record_size: usize,
}

impl SyslogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
        }
    }

    /// 최대 레코드 크기를 설정합니다.
    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    /// syslog severity를 로그 레벨로 매핑합니다.
    fn severity_to_level(severity: u8) -> LogLevel {
        match severity {
            0..=2 => LogLevel::Fatal,
            3 => LogLevel::Error,
            4 => LogLevel::Warning,
            5 | 6 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    /// PRI 값에서 facility와 severity를 분리합니다.
    ///
    /// PRI = facility * 8 + severity
    fn decode_pri(pri: u8) -> (u8, u8) {
        (pri / 8, pri % 8)
    }

    fn facility_name(facility: u8) -> String {
        FACILITY_NAMES
            .get(usize::from(facility))
            .map(|name| (*name).to_owned())
            .unwrap_or_else(|| facility.to_string())
    }

    fn parse_line(&self, raw: &str, sequence: u64) -> Result<LogRecord, TailError> {
        if raw.len() > self.max_record_size {
            return Err(TailError::TooLarge {
                size: raw.len(),
                max: self.max_record_size,
            });
        }

        let input = raw.trim();
        if input.is_empty() {
            return Err(TailError::parse(FORMAT, "empty input"));
        }

        // PRI 파싱: <NNN>
        if !input.starts_with('<') {
            return Err(TailError::parse(FORMAT, "missing PRI field (expected '<')"));
        }

        let pri_end = input
            .find('>')
            .ok_or_else(|| TailError::parse(FORMAT, "unterminated PRI field"))?;

        let pri_str = &input[1..pri_end];
        let pri: u8 = pri_str
            .parse()
            .map_err(|_| TailError::parse(FORMAT, format!("invalid PRI value: '{pri_str}'")))?;

        if pri > MAX_SYSLOG_PRI {
            return Err(TailError::parse(
                FORMAT,
                format!("PRI value {pri} out of valid range (0-{MAX_SYSLOG_PRI})"),
            ));
        }

        let (facility, severity) = Self::decode_pri(pri);
        let remainder = &input[pri_end + 1..];

        let body = if let Some(body) = remainder.strip_prefix("1 ") {
            Self::parse_rfc5424_body(body)?
        } else {
            Self::parse_rfc3164_body(remainder)
        };

        let mut custom_data = Vec::with_capacity(4 + body.structured.len());
        if !body.hostname.is_empty() {
            custom_data.push(("hostname".to_owned(), body.hostname));
        }
        custom_data.push(("facility".to_owned(), Self::facility_name(facility)));
        if !body.msg_id.is_empty() {
            custom_data.push(("msgid".to_owned(), body.msg_id));
        }
        custom_data.extend(body.structured);

        Ok(LogRecord::new(
            sequence,
            Self::severity_to_level(severity),
            body.timestamp.unwrap_or_else(Utc::now),
            body.app_name,
            body.message,
        )
        .with_thread(body.proc_id)
        .with_custom_data(custom_data))
    }

    /// RFC 5424 메시지 본문을 파싱합니다.
    ///
    /// 형식: `TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG`
    fn parse_rfc5424_body(body: &str) -> Result<SyslogBody, TailError> {
        let parts: Vec<&str> = body.splitn(6, ' ').collect();

        if parts.len() < 6 {
            return Err(TailError::parse(
                FORMAT,
                format!(
                    "RFC 5424 requires at least 6 fields after version, got {}",
                    parts.len()
                ),
            ));
        }

        let timestamp_str = Self::nilvalue_to_empty(parts[0]);
        let timestamp = if timestamp_str.is_empty() {
            None
        } else {
            Some(Self::parse_rfc3339(timestamp_str)?)
        };

        let sd_and_msg = parts[5];
        let (message, structured) = if sd_and_msg.starts_with('[') {
            let (sd_part, msg_part) = Self::split_sd_and_message(sd_and_msg);
            (msg_part, Self::parse_structured_data(&sd_part)?)
        } else if let Some(msg) = sd_and_msg.strip_prefix("- ") {
            (msg.to_owned(), Vec::new())
        } else if sd_and_msg == "-" {
            (String::new(), Vec::new())
        } else {
            (sd_and_msg.to_owned(), Vec::new())
        };

        Ok(SyslogBody {
            timestamp,
            hostname: Self::nilvalue_to_empty(parts[1]).to_owned(),
            app_name: Self::nilvalue_to_empty(parts[2]).to_owned(),
            proc_id: Self::nilvalue_to_empty(parts[3]).to_owned(),
            msg_id: Self::nilvalue_to_empty(parts[4]).to_owned(),
            message,
            structured,
        })
    }

    /// RFC 3164 (BSD syslog) 메시지 본문을 최선 노력으로 파싱합니다.
    ///
    /// 타임스탬프를 인식하지 못하면 본문 전체를 메시지로 취급합니다.
    fn parse_rfc3164_body(body: &str) -> SyslogBody {
        // "MMM DD HH:MM:SS" 는 15자 고정 (한 자리 날짜는 공백으로 채움)
        let timestamp = body
            .get(..15)
            .and_then(|candidate| Self::parse_bsd_timestamp(candidate).ok());

        let Some(timestamp) = timestamp else {
            return SyslogBody {
                message: body.trim().to_owned(),
                ..Default::default()
            };
        };

        let rest = body[15..].trim_start();
        let Some((hostname, tag_and_msg)) = rest.split_once(' ') else {
            return SyslogBody {
                timestamp: Some(timestamp),
                message: rest.to_owned(),
                ..Default::default()
            };
        };

        // TAG 는 ':' 앞까지이며 공백을 포함하지 않음
        let (tag, message) = match tag_and_msg.split_once(':') {
            Some((tag, msg)) if !tag.is_empty() && !tag.contains(char::is_whitespace) => {
                (tag, msg.trim_start().to_owned())
            }
            _ => ("", tag_and_msg.to_owned()),
        };

        let (app_name, proc_id) = Self::split_tag(tag);

        SyslogBody {
            timestamp: Some(timestamp),
            hostname: hostname.to_owned(),
            app_name,
            proc_id,
            message,
            ..Default::default()
        }
    }

    /// `sshd[1234]` 형식의 TAG를 (이름, PID)로 분리합니다.
    fn split_tag(tag: &str) -> (String, String) {
        match tag.split_once('[') {
            Some((name, rest)) => {
                let pid = rest.strip_suffix(']').unwrap_or(rest);
                (name.to_owned(), pid.to_owned())
            }
            None => (tag.to_owned(), String::new()),
        }
    }

    /// NILVALUE (`-`)를 빈 문자열로 변환합니다.
    fn nilvalue_to_empty(value: &str) -> &str {
        if value == "-" { "" } else { value }
    }

    /// RFC 3339 타임스탬프를 파싱합니다.
    ///
    /// 예: `2024-01-15T12:00:00Z` 또는 `2024-01-15T12:00:00.123+09:00`
    fn parse_rfc3339(timestamp: &str) -> Result<DateTime<Utc>, TailError> {
        DateTime::parse_from_rfc3339(timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                TailError::parse(
                    FORMAT,
                    format!("invalid RFC 3339 timestamp '{timestamp}': {e}"),
                )
            })
    }

    /// BSD syslog 타임스탬프를 파싱합니다.
    ///
    /// 형식: `MMM DD HH:MM:SS` (예: `Jan 15 12:00:00`, `Jan  5 12:00:00`)
    /// 연도 정보가 없으므로 현재 연도를 가정합니다.
    fn parse_bsd_timestamp(timestamp: &str) -> Result<DateTime<Utc>, TailError> {
        let normalized = timestamp.split_whitespace().collect::<Vec<_>>().join(" ");
        let with_year = format!("{} {}", Utc::now().year(), normalized);

        let naive = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S").map_err(|e| {
            TailError::parse(FORMAT, format!("invalid BSD timestamp '{timestamp}': {e}"))
        })?;

        Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }

    /// Structured Data 부분과 메시지 부분을 분리합니다.
    ///
    /// SD는 하나 이상의 `[...]` 블록으로 구성되며, 그 이후가 메시지입니다.
    fn split_sd_and_message(input: &str) -> (String, String) {
        let mut depth = 0usize;
        let mut in_quote = false;
        let mut escaped = false;

        for (idx, ch) in input.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }

            match ch {
                '\\' if in_quote => escaped = true,
                '"' => in_quote = !in_quote,
                '[' if !in_quote => depth += 1,
                ']' if !in_quote => {
                    depth = depth.saturating_sub(1);
                    let next = idx + ch.len_utf8();
                    // 다음 SD 요소가 바로 붙어 있지 않으면 SD 종료
                    if depth == 0 && !input[next..].starts_with('[') {
                        return (
                            input[..next].to_owned(),
                            input[next..].trim_start().to_owned(),
                        );
                    }
                }
                _ => {}
            }
        }

        // 닫히지 않은 SD가 있으면 전체를 SD로 간주
        (input.to_owned(), String::new())
    }

    /// RFC 5424 Structured Data를 파싱합니다.
    ///
    /// 형식: `[sd-id param1="value1" param2="value2"][sd-id2 ...]`
    /// 추출된 파라미터는 `sd_{id}_{param}` 형식의 키로 반환됩니다.
    fn parse_structured_data(sd: &str) -> Result<Vec<(String, String)>, TailError> {
        let mut fields = Vec::new();
        let mut chars = sd.chars().peekable();

        while chars.peek().is_some() {
            if chars.next() != Some('[') {
                break;
            }

            let mut sd_id = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == ']' || ch == ' ' {
                    break;
                }
                sd_id.push(ch);
                chars.next();
            }

            if sd_id.is_empty() {
                return Err(TailError::parse(FORMAT, "empty SD-ID in structured data"));
            }

            while let Some(&ch) = chars.peek() {
                if ch == ']' {
                    chars.next();
                    break;
                }

                if ch == ' ' {
                    chars.next();
                    continue;
                }

                let mut param_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '=' {
                        break;
                    }
                    param_name.push(ch);
                    chars.next();
                }

                if chars.next() != Some('=') {
                    break;
                }

                if chars.next() != Some('"') {
                    return Err(TailError::parse(FORMAT, "SD-PARAM value must be quoted"));
                }

                let mut param_value = String::new();
                let mut escaped = false;
                for ch in chars.by_ref() {
                    if escaped {
                        param_value.push(ch);
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '"' {
                        break;
                    } else {
                        param_value.push(ch);
                    }
                }

                fields.push((format!("sd_{sd_id}_{param_name}"), param_value));
            }
        }

        Ok(fields)
    }
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageParser for SyslogParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn framing(&self) -> Framing {
        Framing::LineDelimited
    }

    /// 첫 줄이 `<숫자 1~3자리>` 로 시작하는지 확인합니다.
    fn sniff(&self, first_line: &str) -> bool {
        let Some(rest) = first_line.strip_prefix('<') else {
            return false;
        };
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        (1..=3).contains(&digits) && rest[digits..].starts_with('>')
    }

    fn parse(&self, raw: &str, sequence: u64) -> Result<LogRecord, LogtideError> {
        self.parse_line(raw, sequence).map_err(LogtideError::from)
    }
}
