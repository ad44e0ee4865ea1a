//! 오프셋 커서 -- 파일별 마지막 소비 위치 추적
//!
//! `advance`로 읽을 바이트 수를 계산하고, 실제로 읽은 뒤 `commit`으로 위치를 확정합니다.
//! 두 단계가 분리되어 있어 읽기에 실패해도 읽지 못한 데이터를 건너뛰지 않습니다.
//!
//! 파일 길이가 마지막 위치보다 작아지면 축소(truncation) 또는 재생성으로 보고
//! 위치를 0으로 되돌립니다. inode 비교는 하지 않으므로 같은 길이 이상으로
//! 재생성된 파일은 감지하지 못합니다.

/// 파일 하나의 읽기 위치
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetCursor {
    /// 마지막으로 확정된 바이트 위치
    last_offset: u64,
    /// 마지막 `advance` 시점의 파일 길이
    stream_length: u64,
    /// 축소 감지로 위치를 되돌린 횟수
    rotations: u64,
}

impl OffsetCursor {
    /// 주어진 위치에서 시작하는 커서를 생성합니다.
    pub fn new(start_offset: u64) -> Self {
        Self {
            last_offset: start_offset,
            stream_length: start_offset,
            rotations: 0,
        }
    }

    /// 마지막으로 확정된 위치
    pub fn offset(&self) -> u64 {
        self.last_offset
    }

    /// 마지막 `advance` 시점의 파일 길이
    pub fn stream_length(&self) -> u64 {
        self.stream_length
    }

    /// 지금까지 감지한 축소 횟수
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// 현재 파일 길이가 마지막 위치보다 작은지 확인합니다.
    pub fn is_truncated(&self, current_length: u64) -> bool {
        current_length < self.last_offset
    }

    /// 현재 파일 길이를 반영하고 새로 읽을 수 있는 바이트 수를 반환합니다.
    ///
    /// - 길이가 같으면 0 (호출자는 읽기를 생략)
    /// - 길이가 줄었으면 위치를 0으로 되돌리고 전체 길이를 반환
    /// - 그 외에는 늘어난 만큼을 반환
    pub fn advance(&mut self, current_length: u64) -> u64 {
        self.stream_length = current_length;

        if current_length == self.last_offset {
            return 0;
        }

        if current_length < self.last_offset {
            self.last_offset = 0;
            self.rotations += 1;
            return current_length;
        }

        current_length - self.last_offset
    }

    /// 실제로 소비한 위치를 확정합니다. 관측한 파일 길이를 넘지 않습니다.
    pub fn commit(&mut self, offset: u64) {
        self.last_offset = offset.min(self.stream_length);
    }

    /// 새로 연 파일을 위해 위치를 0으로 초기화합니다.
    pub fn reset(&mut self) {
        self.last_offset = 0;
        self.stream_length = 0;
    }
}
