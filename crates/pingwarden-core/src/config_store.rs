//! 제어 레코드 파일 관리.
//!
//! 단일 [`ControlConfig`]의 메모리 사본과 JSON 파일을 함께 소유한다.
//! 변경은 메모리에 먼저 반영한 뒤 즉시 파일에 저장한다 (임시 파일 → rename).

use crate::config::ControlConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 제어 레코드 파일 이름
const CONTROL_FILE_NAME: &str = "control.json";

/// 저장 중 임시 파일 확장자
const TEMP_EXTENSION: &str = "json.tmp";

/// 제어 레코드 저장소
///
/// 프로세스 안에서 권위 있는 사본은 이 구조체 하나뿐이다.
/// 소유자(에이전트 큐 소비자)만 `&mut`로 변경한다.
#[derive(Debug)]
pub struct ConfigStore {
    /// 현재 레코드
    config: ControlConfig,
    /// 파일 경로
    path: PathBuf,
}

impl ConfigStore {
    /// 지정된 경로로 저장소를 열고 레코드를 로드한다.
    ///
    /// 파일이 없거나 손상됐으면 기본값으로 시작하고 즉시 저장해 복구한다.
    pub fn open(path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Persistence(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let mut store = Self {
            config: ControlConfig::default(),
            path,
        };
        store.config = store.load();
        Ok(store)
    }

    /// 플랫폼 기본 경로의 파일 경로
    ///
    /// - Linux: `~/.local/share/pingwarden/control.json`
    /// - macOS: `~/Library/Application Support/io.pingwarden.agent/control.json`
    /// - Windows: `%APPDATA%\pingwarden\agent\data\control.json`
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("io", "pingwarden", "agent")
            .map(|dirs| dirs.data_dir().join(CONTROL_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".").join(CONTROL_FILE_NAME))
    }

    /// 파일에서 레코드를 읽어 기본값 위에 병합한다.
    ///
    /// 실패해도 에러를 반환하지 않는다: 없는 파일은 기본값 + 생성,
    /// 손상된 파일은 로그 후 기본값 + 덮어쓰기.
    pub fn load(&self) -> ControlConfig {
        let mut config = match Self::read_file(&self.path) {
            Ok(Some(config)) => {
                debug!("제어 레코드 로드 완료: {}", self.path.display());
                config
            }
            Ok(None) => {
                info!("제어 레코드 없음, 기본값으로 생성: {}", self.path.display());
                self.heal(ControlConfig::default())
            }
            Err(e) => {
                warn!("제어 레코드 손상, 기본값으로 복구: {e}");
                self.heal(ControlConfig::default())
            }
        };

        if config.sanitize() {
            config = self.heal(config);
        }

        config
    }

    /// 레코드를 파일에 저장한다.
    ///
    /// 같은 디렉토리의 임시 파일에 쓴 뒤 rename 하므로 읽는 쪽이 반쯤 쓰인 파일을 보지 않는다.
    pub fn save(&self, config: &ControlConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Persistence(format!("설정 직렬화 실패: {e}")))?;

        let temp_path = self.path.with_extension(TEMP_EXTENSION);
        fs::write(&temp_path, content).map_err(|e| {
            CoreError::Persistence(format!(
                "임시 파일 저장 실패: {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            CoreError::Persistence(format!(
                "설정 파일 교체 실패: {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("제어 레코드 저장 완료: {}", self.path.display());
        Ok(())
    }

    /// 현재 레코드
    pub fn get(&self) -> &ControlConfig {
        &self.config
    }

    /// 레코드를 변경하고 저장한다.
    ///
    /// 메모리 변경은 항상 적용된다. 저장이 실패하면 `Persistence` 에러를 반환하며,
    /// 이후 저장이 성공할 때까지 메모리가 디스크보다 앞선다.
    pub fn update_with<F>(&mut self, updater: F) -> Result<&ControlConfig, CoreError>
    where
        F: FnOnce(&mut ControlConfig),
    {
        updater(&mut self.config);
        self.save(&self.config)?;
        Ok(&self.config)
    }

    /// 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<Option<ControlConfig>, CoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::Persistence(format!(
                    "설정 파일 읽기 실패: {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let config = serde_json::from_str(&content).map_err(|e| {
            CoreError::Persistence(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
        })?;

        Ok(Some(config))
    }

    fn heal(&self, config: ControlConfig) -> ControlConfig {
        if let Err(e) = self.save(&config) {
            warn!("제어 레코드 복구 저장 실패: {e}");
        }
        config
    }
}
