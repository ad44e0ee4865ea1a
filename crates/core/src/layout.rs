//! 레이아웃 저장소 -- 화면 레이아웃 문자열의 영속화
//!
//! 레이아웃 문자열은 표시 계층이 만든 불투명한 값으로, 코어는 해석하지 않고
//! 수신기 이름을 키로 그대로 저장하고 돌려줍니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ConfigError, LogtideError};

/// 레이아웃 문자열 저장소
pub trait LayoutStore: Send + Sync {
    /// 저장된 레이아웃을 읽습니다. 없으면 `None`.
    fn load_layout(&self, receiver: &str) -> Option<String>;

    /// 레이아웃을 저장합니다.
    fn save_layout(&self, receiver: &str, layout: &str) -> Result<(), LogtideError>;
}

/// 메모리 기반 레이아웃 저장소 (프로세스 종료 시 사라짐)
#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    layouts: Mutex<BTreeMap<String, String>>,
}

impl MemoryLayoutStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load_layout(&self, receiver: &str) -> Option<String> {
        self.layouts
            .lock()
            .ok()
            .and_then(|layouts| layouts.get(receiver).cloned())
    }

    fn save_layout(&self, receiver: &str, layout: &str) -> Result<(), LogtideError> {
        let mut layouts = self.layouts.lock().map_err(|_| ConfigError::InvalidValue {
            field: "layout".to_owned(),
            reason: "layout store lock poisoned".to_owned(),
        })?;
        layouts.insert(receiver.to_owned(), layout.to_owned());
        Ok(())
    }
}

/// JSON 파일 기반 레이아웃 저장소
///
/// 파일 내용은 `{"수신기 이름": "레이아웃 문자열"}` 형태의 단일 객체입니다.
/// 저장할 때마다 전체 파일을 다시 씁니다.
#[derive(Debug)]
pub struct FileLayoutStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, String>>,
}

impl FileLayoutStore {
    /// 파일에서 저장소를 엽니다. 파일이 없으면 빈 저장소로 시작합니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogtideError> {
        let path = path.as_ref().to_path_buf();
        let cache = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                reason: format!("layout store {}: {}", path.display(), e),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    /// 저장 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayoutStore for FileLayoutStore {
    fn load_layout(&self, receiver: &str) -> Option<String> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(receiver).cloned())
    }

    fn save_layout(&self, receiver: &str, layout: &str) -> Result<(), LogtideError> {
        let mut cache = self.cache.lock().map_err(|_| ConfigError::InvalidValue {
            field: "layout".to_owned(),
            reason: "layout store lock poisoned".to_owned(),
        })?;
        cache.insert(receiver.to_owned(), layout.to_owned());

        let content = serde_json::to_string_pretty(&*cache).map_err(|e| {
            ConfigError::ParseFailed {
                reason: format!("failed to serialize layouts: {e}"),
            }
        })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
