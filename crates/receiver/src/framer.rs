//! 레코드 프레이머 -- 임의 경계로 도착한 바이트를 완성된 레코드 문자열로 분리
//!
//! # 프레이밍 방식
//! - 태그 구분: 줄바꿈 문자를 제거하며 이어 붙이고, 종료 마커가 나올 때마다
//!   마커까지를 레코드 하나로 내보냅니다. 남은 데이터는 마커 **다음**부터 보관합니다.
//! - 줄 구분: `\n`으로 끝난 줄 하나가 레코드 하나입니다. 마지막 미완성 줄은 보관합니다.
//!
//! 미완성 데이터는 바이트로 보관하므로 두 번의 추가 사이에서 잘린 UTF-8 문자도
//! 손상되지 않습니다. 문자열 변환은 레코드가 완성된 뒤 한 번만 합니다.

use bytes::BytesMut;
use logtide_core::receiver::Framing;

/// 프레이밍 전략
#[derive(Debug, Clone, PartialEq, Eq)]
enum Strategy {
    /// 종료 마커 기준
    TagDelimited { marker: Vec<u8> },
    /// 줄 기준
    LineDelimited,
}

/// 레코드 프레이머
///
/// 추가된 바이트를 [`push`](Self::push)로 넣으면 완성된 레코드를 순서대로 돌려줍니다.
/// 보관 중인 미완성 데이터(pending fragment)는 [`reset`](Self::reset)에서만 버려집니다.
#[derive(Debug, Clone)]
pub struct RecordFramer {
    strategy: Strategy,
    /// 아직 레코드가 되지 못한 바이트
    pending: BytesMut,
    /// 다음 검색 시작 위치 (`pending` 기준)
    scan_from: usize,
}

impl RecordFramer {
    /// 파서가 선언한 프레이밍 방식으로 프레이머를 생성합니다.
    pub fn new(framing: Framing) -> Self {
        match framing {
            Framing::TagDelimited { end_marker } => Self::tag_delimited(end_marker),
            Framing::LineDelimited => Self::line_delimited(),
        }
    }

    /// 종료 마커 기준 프레이머를 생성합니다.
    pub fn tag_delimited(end_marker: &str) -> Self {
        Self {
            strategy: Strategy::TagDelimited {
                marker: end_marker.as_bytes().to_vec(),
            },
            pending: BytesMut::new(),
            scan_from: 0,
        }
    }

    /// 줄 기준 프레이머를 생성합니다.
    pub fn line_delimited() -> Self {
        Self {
            strategy: Strategy::LineDelimited,
            pending: BytesMut::new(),
            scan_from: 0,
        }
    }

    /// 보관 중인 미완성 데이터 크기 (바이트)
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 미완성 데이터를 버립니다. 커서가 0으로 되돌아갈 때만 호출합니다.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.scan_from = 0;
    }

    /// 새로 읽은 바이트를 추가하고 완성된 레코드를 반환합니다.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match &self.strategy {
            Strategy::TagDelimited { marker } => {
                let marker = marker.clone();
                self.push_tagged(chunk, &marker)
            }
            Strategy::LineDelimited => self.push_lines(chunk),
        }
    }

    /// 파일이 끝났음을 알리고 남은 데이터를 정리합니다.
    ///
    /// 줄 구분 방식에서는 줄바꿈 없이 끝난 마지막 줄을 레코드로 내보냅니다.
    /// 태그 구분 방식에서는 마커가 없는 데이터는 레코드가 아니므로 버립니다.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.pending.split();
        self.scan_from = 0;

        match self.strategy {
            Strategy::LineDelimited => decode_line(&rest),
            Strategy::TagDelimited { .. } => None,
        }
    }

    fn push_tagged(&mut self, chunk: &[u8], marker: &[u8]) -> Vec<String> {
        self.pending.reserve(chunk.len());
        for piece in chunk.split(|&b| b == b'\r' || b == b'\n') {
            self.pending.extend_from_slice(piece);
        }

        let mut records = Vec::new();
        if marker.is_empty() {
            return records;
        }

        loop {
            let found = self.pending[self.scan_from..]
                .windows(marker.len())
                .position(|window| window == marker);

            match found {
                Some(pos) => {
                    let end = self.scan_from + pos + marker.len();
                    let raw = self.pending.split_to(end);
                    self.scan_from = 0;

                    let text = String::from_utf8_lossy(&raw);
                    let text = text.trim_start();
                    if !text.is_empty() {
                        records.push(text.to_owned());
                    }
                }
                None => {
                    // 마커가 두 번의 추가에 걸쳐 잘려 있을 수 있으므로 마지막 부분은 다시 검사
                    self.scan_from = self.pending.len().saturating_sub(marker.len() - 1);
                    break;
                }
            }
        }

        records
    }

    fn push_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.pending[self.scan_from..]
            .iter()
            .position(|&b| b == b'\n')
        {
            let newline = self.scan_from + pos;
            let mut line = self.pending.split_to(newline + 1);
            line.truncate(newline);
            self.scan_from = 0;

            if let Some(record) = decode_line(&line) {
                records.push(record);
            }
        }
        self.scan_from = self.pending.len();

        records
    }
}

/// 줄 하나를 문자열로 변환합니다. 빈 줄은 `None`.
fn decode_line(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = String::from_utf8_lossy(line);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}
