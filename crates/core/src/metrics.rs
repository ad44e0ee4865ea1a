//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 수신기는 이 상수로 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 모든 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logtide_receiver_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logtide_core::metrics::RECEIVER_RECORDS_PARSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파서 형식 레이블 키 (log4j, syslog, json)
pub const LABEL_FORMAT: &str = "format";

// ─── Receiver 메트릭 ──────────────────────────────────────────────

/// Receiver: 읽은 바이트 수 (counter)
pub const RECEIVER_BYTES_READ_TOTAL: &str = "logtide_receiver_bytes_read_total";

/// Receiver: 파싱에 성공한 레코드 수 (counter, label: format)
pub const RECEIVER_RECORDS_PARSED_TOTAL: &str = "logtide_receiver_records_parsed_total";

/// Receiver: 파싱에 실패해 건너뛴 레코드 수 (counter, label: format)
pub const RECEIVER_RECORDS_MALFORMED_TOTAL: &str = "logtide_receiver_records_malformed_total";

/// Receiver: 싱크로 전달한 배치 수 (counter)
pub const RECEIVER_BATCHES_DELIVERED_TOTAL: &str = "logtide_receiver_batches_delivered_total";

/// Receiver: 파일 축소/재생성으로 오프셋을 0으로 되돌린 횟수 (counter)
pub const RECEIVER_ROTATIONS_TOTAL: &str = "logtide_receiver_rotations_total";

/// Receiver: 감시 채널 실패로 재구독한 횟수 (counter)
pub const RECEIVER_WATCH_FAILURES_TOTAL: &str = "logtide_receiver_watch_failures_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        RECEIVER_BYTES_READ_TOTAL,
        "Total bytes read from observed log files"
    );
    describe_counter!(
        RECEIVER_RECORDS_PARSED_TOTAL,
        "Total log records parsed successfully"
    );
    describe_counter!(
        RECEIVER_RECORDS_MALFORMED_TOTAL,
        "Total framed records skipped because parsing failed"
    );
    describe_counter!(
        RECEIVER_BATCHES_DELIVERED_TOTAL,
        "Total record batches delivered to sinks"
    );
    describe_counter!(
        RECEIVER_ROTATIONS_TOTAL,
        "Total cursor resets caused by truncated or recreated files"
    );
    describe_counter!(
        RECEIVER_WATCH_FAILURES_TOTAL,
        "Total watch subscription failures that triggered a resubscribe"
    );
}
