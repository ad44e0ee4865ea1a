#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`cursor`]: 파일별 읽은 위치와 잘림(truncation) 감지
//! - [`framer`]: 바이트 조각을 완성된 레코드 문자열로 재조립 (종료 태그 / 줄 단위)
//! - [`parser`]: log4j XML, syslog, JSON Lines 파서와 형식 자동 탐지
//! - [`source`]: 파일/디렉토리 수신기, 변경 구독, 알림 처리 태스크
//! - [`sort`]: 숫자 인식 자연 정렬
//! - [`sink`]: 기본 싱크 (`mpsc` 채널)
//! - [`config`]: 수신기 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod cursor;
pub mod error;
pub mod framer;
mod lifecycle;
pub mod parser;
pub mod sink;
pub mod sort;
pub mod source;

// --- 주요 타입 re-export ---

// 수신기
pub use source::{DirectoryReceiver, FileReceiver, resolve_format};

// 설정
pub use config::{SourceConfig, SourceConfigBuilder, SourceKind};

// 에러
pub use error::TailError;

// 파서
pub use parser::{JsonFieldMapping, JsonLinesParser, LogFormat, Log4jXmlParser, SyslogParser, detect_format};

// 엔진 구성 요소
pub use cursor::OffsetCursor;
pub use framer::RecordFramer;
pub use sink::ChannelSink;
pub use sort::{natural_cmp, natural_sort};
