//! 테일 상태 -- 현재 파일 핸들, 오프셋 커서, 프레이머, 순번 카운터
//!
//! 하나의 읽기 패스는 다음 순서로 진행됩니다.
//!
//! ```text
//! metadata.len -> OffsetCursor::advance -> seek + read -> commit
//!              -> RecordFramer::push -> MessageParser::parse (순번 선증가)
//! ```
//!
//! 이 상태는 소스마다 하나의 `tokio::sync::Mutex` 뒤에 있으며,
//! 알림 처리 태스크와 `refresh()`가 같은 락으로 직렬화됩니다.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use logtide_core::metrics as m;
use logtide_core::receiver::MessageParser;
use logtide_core::types::LogRecord;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use crate::cursor::OffsetCursor;
use crate::error::TailError;
use crate::framer::RecordFramer;

/// 현재 테일링 중인 파일
struct TailedFile {
    path: PathBuf,
    file: File,
    cursor: OffsetCursor,
    framer: RecordFramer,
}

/// 소스 하나의 가변 테일 상태
pub(crate) struct TailState {
    parser: Box<dyn MessageParser>,
    /// 마지막으로 할당한 순번 (다음 레코드는 +1)
    sequence: u64,
    current: Option<TailedFile>,
}

impl TailState {
    pub(crate) fn new(parser: Box<dyn MessageParser>) -> Self {
        Self {
            parser,
            sequence: 0,
            current: None,
        }
    }

    pub(crate) fn parser(&self) -> &dyn MessageParser {
        self.parser.as_ref()
    }

    /// 마지막으로 할당한 순번
    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    /// 순번만 초기화합니다. 오프셋은 유지되므로 이미 읽은 내용은 다시 파싱하지 않습니다.
    pub(crate) fn clear_sequence(&mut self) {
        self.sequence = 0;
    }

    pub(crate) fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|tailed| tailed.path.as_path())
    }

    pub(crate) fn current_offset(&self) -> Option<u64> {
        self.current.as_ref().map(|tailed| tailed.cursor.offset())
    }

    /// 파일을 열고 시작 오프셋을 정합니다.
    ///
    /// `from_beginning`이 아니면 현재 파일 끝에서 시작하여 이후 추가분만 읽습니다.
    /// 이전 핸들은 닫힙니다.
    pub(crate) async fn open(&mut self, path: &Path, from_beginning: bool) -> Result<(), TailError> {
        let file = File::open(path).await.map_err(|e| unavailable(path, &e))?;
        let length = file.metadata().await?.len();
        let start = if from_beginning { 0 } else { length };

        debug!(path = %path.display(), offset = start, length, "opened log file");

        self.current = Some(TailedFile {
            path: path.to_path_buf(),
            file,
            cursor: OffsetCursor::new(start),
            framer: RecordFramer::new(self.parser.framing()),
        });
        Ok(())
    }

    /// 파일 핸들을 해제합니다. 여러 번 호출해도 안전합니다.
    pub(crate) fn close(&mut self) {
        if let Some(tailed) = self.current.take() {
            debug!(
                path = %tailed.path.display(),
                offset = tailed.cursor.offset(),
                "closed log file"
            );
        }
    }

    /// 현재 파일에서 새로 추가된 바이트를 읽어 레코드로 변환합니다.
    ///
    /// 새 바이트가 없으면 빈 배치를 반환합니다.
    pub(crate) async fn read_pass(&mut self) -> Result<Vec<LogRecord>, TailError> {
        let Some(tailed) = self.current.as_mut() else {
            return Ok(Vec::new());
        };

        let length = tailed.file.metadata().await?.len();
        if tailed.cursor.is_truncated(length) {
            warn!(
                path = %tailed.path.display(),
                offset = tailed.cursor.offset(),
                length,
                "log file shrank, re-reading from start"
            );
            tailed.framer.reset();
            metrics::counter!(m::RECEIVER_ROTATIONS_TOTAL).increment(1);
        }

        let available = tailed.cursor.advance(length);
        if available == 0 {
            return Ok(Vec::new());
        }

        let start = tailed.cursor.offset();
        tailed.file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::new();
        (&mut tailed.file).take(available).read_to_end(&mut buf).await?;
        let read = buf.len() as u64;
        tailed.cursor.commit(start + read);
        metrics::counter!(m::RECEIVER_BYTES_READ_TOTAL).increment(read);

        let raws = tailed.framer.push(&buf);
        let path = tailed.path.clone();
        Ok(self.parse_batch(raws, &path))
    }

    /// 현재 파일을 마저 읽은 뒤 `path`를 오프셋 0부터 새로 엽니다.
    ///
    /// 이전 핸들의 마지막 줄(줄 단위 형식)도 함께 내보내므로 로테이션 경계에서
    /// 레코드가 사라지거나 중복되지 않습니다.
    pub(crate) async fn switch_to(&mut self, path: &Path) -> Result<Vec<LogRecord>, TailError> {
        let mut records = match self.read_pass().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "failed to drain previous log file");
                Vec::new()
            }
        };

        if let Some(mut previous) = self.current.take() {
            let trailing: Vec<String> = previous.framer.finish().into_iter().collect();
            records.extend(self.parse_batch(trailing, &previous.path));
            debug!(
                from = %previous.path.display(),
                to = %path.display(),
                "switching to rotated log file"
            );
        }

        self.open(path, true).await?;
        records.extend(self.read_pass().await?);
        Ok(records)
    }

    /// 파일 전체를 한 번 읽습니다. 현재 파일 상태는 건드리지 않습니다.
    pub(crate) async fn replay(&mut self, path: &Path) -> Result<Vec<LogRecord>, TailError> {
        let data = tokio::fs::read(path).await.map_err(|e| unavailable(path, &e))?;
        metrics::counter!(m::RECEIVER_BYTES_READ_TOTAL).increment(data.len() as u64);

        let mut framer = RecordFramer::new(self.parser.framing());
        let mut raws = framer.push(&data);
        raws.extend(framer.finish());

        debug!(path = %path.display(), records = raws.len(), "replayed backlog file");
        Ok(self.parse_batch(raws, path))
    }

    /// 레코드 문자열을 파싱합니다. 실패한 레코드는 경고 후 건너뛰지만 순번은 소비합니다.
    fn parse_batch(&mut self, raws: Vec<String>, path: &Path) -> Vec<LogRecord> {
        let mut records = Vec::with_capacity(raws.len());

        for raw in raws {
            self.sequence += 1;
            match self.parser.parse(&raw, self.sequence) {
                Ok(record) => records.push(record),
                Err(e) => {
                    metrics::counter!(
                        m::RECEIVER_RECORDS_MALFORMED_TOTAL,
                        m::LABEL_FORMAT => self.parser.format_name().to_owned()
                    )
                    .increment(1);
                    warn!(
                        path = %path.display(),
                        sequence = self.sequence,
                        error = %e,
                        "skipping malformed record"
                    );
                }
            }
        }

        if !records.is_empty() {
            metrics::counter!(
                m::RECEIVER_RECORDS_PARSED_TOTAL,
                m::LABEL_FORMAT => self.parser.format_name().to_owned()
            )
            .increment(records.len() as u64);
        }

        records
    }
}

fn unavailable(path: &Path, error: &std::io::Error) -> TailError {
    TailError::SourceUnavailable {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}
