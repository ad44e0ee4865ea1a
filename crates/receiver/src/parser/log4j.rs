//! log4j XML 이벤트 파서
//!
//! Log4Net `XmlLayoutSchemaLog4j`와 NLog `Log4JXmlEventLayout`이 쓰는
//! `<log4j:event>` 조각 하나를 파싱합니다.
//!
//! # 이벤트 형식
//! ```text
//! <log4j:event logger="App.Service" timestamp="1705320000123" level="WARN" thread="7">
//!   <log4j:message>disk almost full</log4j:message>
//!   <log4j:throwable>System.IO.IOException: ...</log4j:throwable>
//!   <log4j:locationInfo class="App.Service" method="Check" file="Service.cs" line="42"/>
//!   <log4j:properties>
//!     <log4j:data name="log4net:HostName" value="web-01"/>
//!   </log4j:properties>
//! </log4j:event>
//! ```
//!
//! 조각마다 네임스페이스 선언이 없으므로 접두어를 떼고 로컬 이름으로만 비교합니다.

use chrono::{DateTime, TimeZone, Utc};
use logtide_core::config::DEFAULT_MAX_RECORD_SIZE;
use logtide_core::error::LogtideError;
use logtide_core::receiver::{Framing, MessageParser};
use logtide_core::types::{Location, LogLevel, LogRecord};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TailError;

/// log4j 이벤트 종료 태그
pub const LOG4J_END_MARKER: &str = "</log4j:event>";

/// 첫 줄에서 형식을 추정할 때 찾는 시작 태그 조각
const LOG4J_SIGNATURE: &str = "<log4j:event";

const FORMAT: &str = "log4j";

/// 현재 텍스트가 채워질 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Message,
    Throwable,
}

/// 이벤트 루트 요소의 필수/선택 속성
struct EventHeader {
    logger: String,
    timestamp: DateTime<Utc>,
    level: LogLevel,
    thread: String,
}

/// log4j XML 이벤트 파서
pub struct Log4jXmlParser {
    /// 최대 허용 레코드 크기 (바이트)
    max_record_size: usize,
}

impl Log4jXmlParser {
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

    fn parse_event(&self, raw: &str, sequence: u64) -> Result<LogRecord, TailError> {
        if raw.len() > self.max_record_size {
            return Err(TailError::TooLarge {
                size: raw.len(),
                max: self.max_record_size,
            });
        }

        let mut reader = Reader::from_str(raw);
        reader.trim_text(true);

        let mut header: Option<EventHeader> = None;
        let mut target = TextTarget::None;
        let mut message = String::new();
        let mut throwable = String::new();
        let mut location = Location::default();
        let mut custom_data = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                TailError::parse(
                    FORMAT,
                    format!("xml error at {}: {}", reader.buffer_position(), e),
                )
            })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let name = e.local_name();
                    let name = name.as_ref();

                    if header.is_none() {
                        if name != b"event" {
                            return Err(TailError::parse(
                                FORMAT,
                                format!(
                                    "expected <log4j:event> root element, found <{}>",
                                    String::from_utf8_lossy(name)
                                ),
                            ));
                        }
                        header = Some(Self::parse_header(e)?);
                        continue;
                    }

                    match name {
                        b"message" => target = TextTarget::Message,
                        b"throwable" => target = TextTarget::Throwable,
                        b"locationInfo" => location = Self::parse_location(e),
                        b"data" => {
                            if let Some(pair) = Self::parse_data(e) {
                                custom_data.push(pair);
                            }
                        }
                        _ => {}
                    }

                    // 빈 요소는 텍스트를 갖지 않음
                    if matches!(event, Event::Empty(_)) {
                        target = TextTarget::None;
                    }
                }
                Event::Text(ref t) => {
                    let text = t
                        .unescape()
                        .map(|cow| cow.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(t).into_owned());
                    Self::append(target, &text, &mut message, &mut throwable);
                }
                Event::CData(ref c) => {
                    let text = String::from_utf8_lossy(c);
                    Self::append(target, &text, &mut message, &mut throwable);
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"event" => break,
                    b"message" | b"throwable" => target = TextTarget::None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let header = header.ok_or_else(|| TailError::parse(FORMAT, "no <log4j:event> element"))?;

        Ok(
            LogRecord::new(sequence, header.level, header.timestamp, header.logger, message)
                .with_thread(header.thread)
                .with_location(location)
                .with_exception(throwable)
                .with_custom_data(custom_data),
        )
    }

    fn append(target: TextTarget, text: &str, message: &mut String, throwable: &mut String) {
        match target {
            TextTarget::Message => message.push_str(text),
            TextTarget::Throwable => throwable.push_str(text),
            TextTarget::None => {}
        }
    }

    fn parse_header(e: &BytesStart<'_>) -> Result<EventHeader, TailError> {
        let mut logger = None;
        let mut timestamp = None;
        let mut level = None;
        let mut thread = String::new();

        for (key, value) in Self::attributes(e) {
            match key.as_str() {
                "logger" => logger = Some(value),
                "timestamp" => timestamp = Some(value),
                "level" => level = Some(value),
                "thread" => thread = value,
                _ => {}
            }
        }

        let logger = logger.ok_or_else(|| missing_attribute("logger"))?;
        let timestamp = timestamp.ok_or_else(|| missing_attribute("timestamp"))?;
        let level = level.ok_or_else(|| missing_attribute("level"))?;

        let millis: i64 = timestamp.trim().parse().map_err(|_| {
            TailError::parse(FORMAT, format!("invalid timestamp '{timestamp}'"))
        })?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| TailError::parse(FORMAT, format!("timestamp out of range: {millis}")))?;

        let level = LogLevel::from_str_loose(&level)
            .ok_or_else(|| TailError::parse(FORMAT, format!("unknown level '{level}'")))?;

        Ok(EventHeader {
            logger,
            timestamp,
            level,
            thread,
        })
    }

    fn parse_location(e: &BytesStart<'_>) -> Location {
        let mut location = Location::default();
        for (key, value) in Self::attributes(e) {
            match key.as_str() {
                "class" => location.class = value,
                "method" => location.method = value,
                "file" => location.file = value,
                "line" => location.line = value.trim().parse().ok(),
                _ => {}
            }
        }
        location
    }

    fn parse_data(e: &BytesStart<'_>) -> Option<(String, String)> {
        let mut name = None;
        let mut value = String::new();
        for (key, val) in Self::attributes(e) {
            match key.as_str() {
                "name" => name = Some(val),
                "value" => value = val,
                _ => {}
            }
        }
        name.map(|name| (name, value))
    }

    /// 속성을 (로컬 이름, 값) 목록으로 추출합니다. 깨진 속성은 건너뜁니다.
    fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
        e.attributes()
            .filter_map(Result::ok)
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|cow| cow.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect()
    }
}

fn missing_attribute(name: &str) -> TailError {
    TailError::parse(FORMAT, format!("missing attribute '{name}'"))
}

impl Default for Log4jXmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageParser for Log4jXmlParser {
    fn format_name(&self) -> &str {
        FORMAT
    }

    fn framing(&self) -> Framing {
        Framing::TagDelimited {
            end_marker: LOG4J_END_MARKER,
        }
    }

    fn sniff(&self, first_line: &str) -> bool {
        first_line.contains(LOG4J_SIGNATURE)
    }

    fn parse(&self, raw: &str, sequence: u64) -> Result<LogRecord, LogtideError> {
        self.parse_event(raw, sequence).map_err(LogtideError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_EVENT: &str = concat!(
        r#"<log4j:event logger="App.Service" timestamp="1705320000123" level="WARN" thread="7">"#,
        r#"<log4j:message>disk &lt;almost&gt; full</log4j:message>"#,
        r#"<log4j:throwable><![CDATA[System.IO.IOException: no space]]></log4j:throwable>"#,
        r#"<log4j:locationInfo class="App.Service" method="Check" file="Service.cs" line="42"/>"#,
        r#"<log4j:properties>"#,
        r#"<log4j:data name="log4net:HostName" value="web-01"/>"#,
        r#"<log4j:data name="log4japp" value="App.exe"/>"#,
        r#"</log4j:properties>"#,
        r#"</log4j:event>"#,
    );

    #[test]
    fn format_metadata() {
        let parser = Log4jXmlParser::new();
        assert_eq!(parser.format_name(), "log4j");
        assert_eq!(
            parser.framing(),
            Framing::TagDelimited {
                end_marker: "</log4j:event>"
            }
        );
    }

    #[test]
    fn parses_full_event() {
        let parser = Log4jXmlParser::new();
        let record = parser.parse(FULL_EVENT, 3).unwrap();

        assert_eq!(record.sequence, 3);
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.logger, "App.Service");
        assert_eq!(record.thread, "7");
        assert_eq!(record.message, "disk <almost> full");
        assert_eq!(record.timestamp.timestamp_millis(), 1_705_320_000_123);
        assert_eq!(
            record.exception.as_deref(),
            Some("System.IO.IOException: no space")
        );

        let location = record.location.unwrap();
        assert_eq!(location.class, "App.Service");
        assert_eq!(location.method, "Check");
        assert_eq!(location.file, "Service.cs");
        assert_eq!(location.line, Some(42));

        assert_eq!(
            record.custom_data,
            vec![
                ("log4net:HostName".to_owned(), "web-01".to_owned()),
                ("log4japp".to_owned(), "App.exe".to_owned()),
            ]
        );
    }

    #[test]
    fn parses_minimal_event() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<log4j:event logger="A" timestamp="0" level="DEBUG"><log4j:message>x</log4j:message></log4j:event>"#;
        let record = parser.parse(raw, 1).unwrap();
        assert_eq!(record.level, LogLevel::Debug);
        assert!(record.thread.is_empty());
        assert!(record.location.is_none());
        assert!(record.exception.is_none());
        assert!(record.custom_data.is_empty());
    }

    #[test]
    fn missing_level_is_malformed() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<log4j:event logger="A" timestamp="0"><log4j:message>x</log4j:message></log4j:event>"#;
        let err = parser.parse(raw, 1).unwrap_err();
        assert!(err.is_malformed_record());
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn invalid_timestamp_is_malformed() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<log4j:event logger="A" timestamp="yesterday" level="INFO"></log4j:event>"#;
        assert!(parser.parse(raw, 1).is_err());
    }

    #[test]
    fn unknown_level_is_malformed() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<log4j:event logger="A" timestamp="0" level="LOUD"></log4j:event>"#;
        assert!(parser.parse(raw, 1).is_err());
    }

    #[test]
    fn log4net_level_names_are_accepted() {
        let parser = Log4jXmlParser::new();
        for (name, expected) in [
            ("SEVERE", LogLevel::Error),
            ("FINER", LogLevel::Trace),
            ("ALL", LogLevel::Trace),
            ("OFF", LogLevel::Fatal),
            ("NOTICE", LogLevel::Info),
        ] {
            let raw = format!(
                r#"<log4j:event logger="A" timestamp="0" level="{name}"><log4j:message>x</log4j:message></log4j:event>"#
            );
            let record = parser.parse(&raw, 1).unwrap();
            assert_eq!(record.level, expected, "level {name}");
        }
    }

    #[test]
    fn wrong_root_element_is_malformed() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<nlog:event logger="A"></nlog:event>"#;
        // 로컬 이름은 event 이므로 허용되지만 필수 속성이 없음
        assert!(parser.parse(raw, 1).is_err());

        let raw = r#"<record logger="A" timestamp="0" level="INFO"></record>"#;
        let err = parser.parse(raw, 1).unwrap_err();
        assert!(err.to_string().contains("root element"));
    }

    #[test]
    fn broken_xml_is_malformed() {
        let parser = Log4jXmlParser::new();
        let raw = r#"<log4j:event logger="A" timestamp="0" level="INFO"><log4j:message>x</log4j:wrong></log4j:event>"#;
        assert!(parser.parse(raw, 1).is_err());
    }

    #[test]
    fn empty_input_is_malformed() {
        let parser = Log4jXmlParser::new();
        assert!(parser.parse("", 1).is_err());
    }

    #[test]
    fn too_large_record_is_rejected() {
        let parser = Log4jXmlParser::new().with_max_record_size(32);
        let err = parser.parse(FULL_EVENT, 1).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn sniff_checks_signature() {
        let parser = Log4jXmlParser::new();
        assert!(parser.sniff(r#"<log4j:event logger="A" timestamp="0" level="INFO">"#));
        assert!(!parser.sniff("<34>1 2024-01-15T12:00:00Z host app - - - msg"));
        assert!(!parser.sniff(""));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_text_does_not_panic(raw in ".{0,400}") {
                let parser = Log4jXmlParser::new();
                let _ = parser.parse(&raw, 1);
            }

            #[test]
            fn message_text_roundtrips(msg in "[a-zA-Z0-9 .,:;!?-]{1,200}") {
                let parser = Log4jXmlParser::new();
                let raw = format!(
                    r#"<log4j:event logger="L" timestamp="1" level="INFO"><log4j:message>{msg}</log4j:message></log4j:event>"#
                );
                let record = parser.parse(&raw, 1).unwrap();
                prop_assert_eq!(record.message, msg.trim());
            }
        }
    }
}
