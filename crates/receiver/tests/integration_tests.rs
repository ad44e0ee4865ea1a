//! 통합 테스트 -- 수신기 생명주기와 테일링 전체 흐름 검증
//!
//! 알림 처리 태스크와 `refresh()`가 같은 락을 공유하므로, 레코드는 어느 쪽으로든
//! 도착할 수 있습니다. 테스트는 기대 개수만큼 채널에서 모은 뒤 중복이 없는지 확인합니다.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use logtide_core::error::{LogtideError, ReceiverError};
use logtide_core::receiver::{LogReceiver, ReceiverState};
use logtide_core::types::{LogLevel, LogRecord};
use logtide_receiver::{
    ChannelSink, DirectoryReceiver, FileReceiver, LogFormat, SourceConfigBuilder,
};

const WAIT: Duration = Duration::from_secs(5);

fn event(logger: &str, msg: &str) -> String {
    format!(
        r#"<log4j:event logger="{logger}" timestamp="1705320000000" level="INFO" thread="1"><log4j:message>{msg}</log4j:message></log4j:event>"#
    )
}

fn syslog(msg: &str) -> String {
    format!("<14>1 2024-01-15T12:00:00Z host app 42 - - {msg}\n")
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}

/// 레코드가 `count`개 모일 때까지 받습니다.
async fn collect(rx: &mut UnboundedReceiver<Vec<LogRecord>>, count: usize) -> Vec<LogRecord> {
    let mut records = Vec::new();
    while records.len() < count {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(batch)) => {
                assert!(!batch.is_empty(), "empty batches must not be delivered");
                records.extend(batch);
            }
            Ok(None) => panic!("sink channel closed"),
            Err(_) => panic!("timed out with {} of {count} records", records.len()),
        }
    }
    records
}

/// 잠시 기다린 뒤 더 도착한 레코드가 없는지 확인합니다.
async fn assert_quiet(rx: &mut UnboundedReceiver<Vec<LogRecord>>) {
    tokio::time::sleep(Duration::from_millis(300)).await;
    if let Ok(batch) = rx.try_recv() {
        panic!("unexpected batch: {batch:?}");
    }
}

fn messages(records: &[LogRecord]) -> Vec<&str> {
    records.iter().map(|r| r.message.as_str()).collect()
}

fn sequences(records: &[LogRecord]) -> Vec<u64> {
    records.iter().map(|r| r.sequence).collect()
}

async fn file_receiver(
    path: &Path,
    format: LogFormat,
    from_beginning: bool,
) -> (FileReceiver, UnboundedReceiver<Vec<LogRecord>>) {
    let config = SourceConfigBuilder::file(path)
        .format(format)
        .start_from_beginning(from_beginning)
        .resubscribe_delay_ms(50)
        .build()
        .unwrap();
    let mut receiver = FileReceiver::new(config, format);
    let (sink, rx) = ChannelSink::new();
    receiver.initialize(Arc::new(sink)).await.unwrap();
    (receiver, rx)
}

/// 빈 파일에 레코드 하나가 세 번에 나뉘어 추가되면 세 번째에서만 레코드 하나가 나온다.
#[tokio::test]
async fn test_record_split_across_three_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "").unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Log4j, true).await;
    let record = event("App", "split");
    let (first, rest) = record.split_at(30);
    let (second, third) = rest.split_at(rest.len() - 5);

    append(&path, first);
    receiver.refresh().await.unwrap();
    append(&path, second);
    receiver.refresh().await.unwrap();
    assert_quiet(&mut rx).await;

    append(&path, third);
    receiver.refresh().await.unwrap();
    let records = collect(&mut rx, 1).await;
    assert_eq!(records[0].sequence, 1);
    assert_eq!(records[0].message, "split");
    assert_eq!(records[0].level, LogLevel::Info);
    assert_quiet(&mut rx).await;

    receiver.shutdown().await.unwrap();
}

/// 시작 위치가 파일 끝이면 기존 내용은 읽지 않는다.
#[tokio::test]
async fn test_start_from_end_skips_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, syslog("old")).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, false).await;
    assert_quiet(&mut rx).await;

    append(&path, &syslog("new"));
    receiver.refresh().await.unwrap();
    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["new"]);
    assert_eq!(records[0].sequence, 1);

    receiver.shutdown().await.unwrap();
}

/// 잘못된 레코드는 건너뛰지만 순번은 소비한다.
#[tokio::test]
async fn test_malformed_record_leaves_sequence_gap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let content = format!("{}not syslog at all\n{}", syslog("a"), syslog("b"));
    fs::write(&path, content).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    let records = collect(&mut rx, 2).await;
    assert_eq!(messages(&records), ["a", "b"]);
    assert_eq!(sequences(&records), [1, 3]);
    assert_eq!(receiver.last_sequence().await, 3);

    receiver.shutdown().await.unwrap();
}

/// 파일이 줄어들면 처음부터 다시 읽는다.
#[tokio::test]
async fn test_truncation_rereads_from_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, format!("{}{}", syslog("one"), syslog("two"))).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    assert_eq!(messages(&collect(&mut rx, 2).await), ["one", "two"]);

    fs::write(&path, syslog("fresh")).unwrap();
    receiver.refresh().await.unwrap();
    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["fresh"]);
    assert_eq!(records[0].sequence, 3);

    receiver.shutdown().await.unwrap();
}

/// 비활성 중 추가된 내용은 재활성화 시 한 번만 전달된다.
#[tokio::test]
async fn test_pause_resume_does_not_reread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, syslog("first")).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    assert_eq!(messages(&collect(&mut rx, 1).await), ["first"]);

    receiver.set_active(false);
    assert!(!receiver.is_active());
    assert_eq!(receiver.state(), ReceiverState::Inactive);

    append(&path, &syslog("while paused"));
    receiver.refresh().await.unwrap();
    assert_quiet(&mut rx).await;

    receiver.set_active(true);
    assert!(receiver.is_active());
    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["while paused"]);
    assert_eq!(records[0].sequence, 2);
    assert_quiet(&mut rx).await;

    receiver.shutdown().await.unwrap();
}

/// `clear`는 순번만 초기화하고 이미 읽은 내용은 다시 읽지 않는다.
#[tokio::test]
async fn test_clear_restarts_sequence_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, format!("{}{}", syslog("a"), syslog("b"))).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    assert_eq!(sequences(&collect(&mut rx, 2).await), [1, 2]);

    receiver.clear().await;
    append(&path, &syslog("c"));
    receiver.refresh().await.unwrap();
    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["c"]);
    assert_eq!(records[0].sequence, 1);

    receiver.shutdown().await.unwrap();
}

/// 파일이 같은 이름으로 다시 만들어지면 알림으로 새 파일을 처음부터 읽는다.
#[tokio::test]
async fn test_recreated_file_is_followed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, syslog("old")).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    assert_eq!(messages(&collect(&mut rx, 1).await), ["old"]);

    fs::remove_file(&path).unwrap();
    fs::write(&path, syslog("recreated")).unwrap();

    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["recreated"]);
    assert_eq!(records[0].sequence, 2);

    receiver.shutdown().await.unwrap();
}

/// 추가 알림만으로도 레코드가 전달된다.
#[tokio::test]
async fn test_append_notification_delivers_without_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "").unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    append(&path, &syslog("watched"));

    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["watched"]);

    receiver.shutdown().await.unwrap();
}

/// 디렉토리 백로그는 오래된 파일부터 재생된다.
#[tokio::test]
async fn test_directory_backlog_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cur.2"), syslog("two")).unwrap();
    fs::write(dir.path().join("cur.1"), syslog("one")).unwrap();
    fs::write(dir.path().join("cur"), syslog("current")).unwrap();
    fs::write(dir.path().join("unrelated.txt"), "ignored\n").unwrap();

    let config = SourceConfigBuilder::directory(dir.path(), r"^cur(\.\d+)?$")
        .format(LogFormat::Syslog)
        .start_from_beginning(true)
        .build()
        .unwrap();
    let mut receiver = DirectoryReceiver::new(config, LogFormat::Syslog).unwrap();
    let (sink, mut rx) = ChannelSink::new();
    receiver.initialize(Arc::new(sink)).await.unwrap();

    let records = collect(&mut rx, 3).await;
    assert_eq!(messages(&records), ["two", "one", "current"]);
    assert_eq!(sequences(&records), [1, 2, 3]);

    append(&dir.path().join("cur"), &syslog("live"));
    receiver.refresh().await.unwrap();
    assert_eq!(messages(&collect(&mut rx, 1).await), ["live"]);

    receiver.shutdown().await.unwrap();
}

/// 빈 디렉토리는 처음 생긴 파일을 현재 파일로 채택한다.
#[tokio::test]
async fn test_directory_adopts_first_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = SourceConfigBuilder::directory(dir.path(), r"^app\.log$")
        .format(LogFormat::Json)
        .build()
        .unwrap();
    let mut receiver = DirectoryReceiver::new(config, LogFormat::Json).unwrap();
    let (sink, mut rx) = ChannelSink::new();
    receiver.initialize(Arc::new(sink)).await.unwrap();

    fs::write(
        dir.path().join("app.log"),
        "{\"level\":\"error\",\"logger\":\"db\",\"message\":\"down\"}\n",
    )
    .unwrap();

    let records = collect(&mut rx, 1).await;
    assert_eq!(records[0].message, "down");
    assert_eq!(records[0].level, LogLevel::Error);

    receiver.shutdown().await.unwrap();
}

/// 생명주기 상태 전이와 잘못된 호출
#[tokio::test]
async fn test_lifecycle_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, syslog("a")).unwrap();

    let config = SourceConfigBuilder::file(&path).build().unwrap();
    let mut receiver = FileReceiver::new(config, LogFormat::Syslog);
    assert_eq!(receiver.state(), ReceiverState::Uninitialized);
    assert!(!receiver.is_active());

    // 초기화 전에는 refresh/reset 불가
    assert!(receiver.refresh().await.is_err());
    assert!(receiver.reset().await.is_err());
    // 초기화 전 shutdown은 아무 일도 하지 않음
    receiver.shutdown().await.unwrap();

    let (sink, _rx) = ChannelSink::new();
    let sink = Arc::new(sink);
    receiver.initialize(sink.clone()).await.unwrap();
    assert_eq!(receiver.state(), ReceiverState::Active);

    let err = receiver.initialize(sink.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        LogtideError::Receiver(ReceiverError::InvalidState { .. })
    ));

    receiver.shutdown().await.unwrap();
    assert_eq!(receiver.state(), ReceiverState::Closed);
    receiver.shutdown().await.unwrap();
    assert_eq!(receiver.state(), ReceiverState::Closed);

    // 닫힌 수신기에서 set_active는 무시됨
    receiver.set_active(true);
    assert_eq!(receiver.state(), ReceiverState::Closed);

    receiver.initialize(sink).await.unwrap();
    assert_eq!(receiver.state(), ReceiverState::Active);
    receiver.shutdown().await.unwrap();
}

/// `reset`은 같은 싱크로 다시 초기화하고 순번은 이어진다.
#[tokio::test]
async fn test_reset_rereads_with_same_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, syslog("a")).unwrap();

    let (mut receiver, mut rx) = file_receiver(&path, LogFormat::Syslog, true).await;
    assert_eq!(sequences(&collect(&mut rx, 1).await), [1]);

    receiver.reset().await.unwrap();
    assert_eq!(receiver.state(), ReceiverState::Active);
    let records = collect(&mut rx, 1).await;
    assert_eq!(messages(&records), ["a"]);
    assert_eq!(records[0].sequence, 2);

    receiver.shutdown().await.unwrap();
}

/// 없는 파일은 초기화에 실패하고 상태는 그대로다.
#[tokio::test]
async fn test_missing_file_fails_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let config = SourceConfigBuilder::file(dir.path().join("missing.log"))
        .build()
        .unwrap();
    let mut receiver = FileReceiver::new(config, LogFormat::Syslog);
    let (sink, _rx) = ChannelSink::new();

    let err = receiver.initialize(Arc::new(sink)).await.unwrap_err();
    assert!(matches!(
        err,
        LogtideError::Receiver(ReceiverError::SourceUnavailable { .. })
    ));
    assert_eq!(receiver.state(), ReceiverState::Uninitialized);
}

/// 형식 확인은 첫 줄만 보고 상태를 바꾸지 않는다.
#[tokio::test]
async fn test_can_handle_source_sniffs_first_line() {
    let dir = tempfile::tempdir().unwrap();
    let log4j = dir.path().join("app.xml.log");
    let text = dir.path().join("app.syslog");
    fs::write(&log4j, event("App", "x")).unwrap();
    fs::write(&text, syslog("x")).unwrap();

    let config = SourceConfigBuilder::file(&log4j).build().unwrap();
    let receiver = FileReceiver::new(config, LogFormat::Log4j);
    assert!(receiver.can_handle_source().await);
    assert_eq!(receiver.state(), ReceiverState::Uninitialized);
    assert_eq!(receiver.last_sequence().await, 0);

    let config = SourceConfigBuilder::file(&text).build().unwrap();
    assert!(!FileReceiver::new(config.clone(), LogFormat::Log4j).can_handle_source().await);
    assert!(FileReceiver::new(config, LogFormat::Syslog).can_handle_source().await);

    let config = SourceConfigBuilder::file(dir.path().join("missing")).build().unwrap();
    assert!(!FileReceiver::new(config, LogFormat::Syslog).can_handle_source().await);
}
