//! 설정 구조체.
//!
//! - [`ControlConfig`]: 스케줄러와 운영자가 함께 변경하는 영속 제어 레코드 (JSON 파일)
//! - [`AgentSettings`]: 프로세스 시작 시 한 번 읽는 접속/자격증명 설정.
//!   `config` crate로 TOML 파일 + 환경변수(`PINGWARDEN__*`)에서 로드.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CoreError;

/// 환경변수 접두사 (`PINGWARDEN__REMOTE__API_TOKEN` 형태)
pub const ENV_PREFIX: &str = "PINGWARDEN";

/// 환경변수 계층 구분자
pub const ENV_SEPARATOR: &str = "__";

// ============================================================
// 제어 레코드 (영속)
// ============================================================

/// 제어 레코드: 핑 사이클과 자동 모드 상태
///
/// 파일에 없는 필드는 기본값을 유지하고, 모르는 필드는 무시한다 (필드 단위 병합).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlConfig {
    /// 핑 사이클 예약 여부
    pub is_running: bool,
    /// 사이클 시작 간격 (분)
    pub interval_minutes: u32,
    /// 낮춘 임계값 유지 시간 (초)
    pub duration_seconds: u32,
    /// 사이클 동안 적용할 임계값 (ms)
    pub target_threshold: u32,
    /// 평상시 임계값 (ms), 사이클 종료 후 복원
    pub default_threshold: u32,
    /// 인원 감시기가 `is_running`을 제어할 수 있는지 여부
    pub auto_mode: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            is_running: false,
            interval_minutes: 30,
            duration_seconds: 60,
            target_threshold: 60,
            default_threshold: 250,
            auto_mode: false,
        }
    }
}

impl ControlConfig {
    /// 사이클 주기
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    /// 낮춘 임계값 유지 시간
    pub fn hold_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_seconds))
    }

    /// 0으로 저장된 양수 필드를 기본값으로 되돌린다.
    ///
    /// 값을 고쳤으면 true 반환 (호출자가 다시 저장).
    pub fn sanitize(&mut self) -> bool {
        let defaults = Self::default();
        let mut fixed = false;

        for (name, value, fallback) in [
            (
                "intervalMinutes",
                &mut self.interval_minutes,
                defaults.interval_minutes,
            ),
            (
                "durationSeconds",
                &mut self.duration_seconds,
                defaults.duration_seconds,
            ),
            (
                "targetThreshold",
                &mut self.target_threshold,
                defaults.target_threshold,
            ),
            (
                "defaultThreshold",
                &mut self.default_threshold,
                defaults.default_threshold,
            ),
        ] {
            if *value == 0 {
                warn!("제어 레코드의 {name}=0, 기본값 {fallback}으로 대체");
                *value = fallback;
                fixed = true;
            }
        }

        fixed
    }
}

// ============================================================
// 시작 설정
// ============================================================

/// 최상위 시작 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    /// 원격 제어 API 설정
    #[serde(default)]
    pub remote: RemoteSettings,
    /// 채팅 플랫폼(표시 계층) 설정
    #[serde(default)]
    pub discord: DiscordSettings,
    /// 인원 감시기 설정
    #[serde(default)]
    pub watchdog: WatchdogSettings,
    /// 운영자 명령 HTTP 서버 설정
    #[serde(default)]
    pub web: WebSettings,
    /// 제어 레코드 파일 경로 (없으면 플랫폼 데이터 디렉토리)
    #[serde(default)]
    pub control_file: Option<PathBuf>,
}

/// 원격 제어 API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// API 기본 URL (필수)
    #[serde(default)]
    pub base_url: String,
    /// Bearer 자격증명 (필수)
    #[serde(default)]
    pub api_token: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// 채팅 플랫폼 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// REST API 기본 URL
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
    /// 봇 토큰 (필수)
    #[serde(default)]
    pub bot_token: String,
    /// 상태 메시지를 게시할 채널 ID (필수)
    #[serde(default)]
    pub channel_id: String,
    /// 인터랙션 서명 검증용 공개키 (hex). 없으면 인터랙션 엔드포인트 비활성화
    #[serde(default)]
    pub public_key: Option<String>,
    /// 로그인 최대 시도 횟수
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u32,
    /// 로그인 재시도 간격 (밀리초, 고정)
    #[serde(default = "default_login_retry_delay_ms")]
    pub login_retry_delay_ms: u64,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            api_base: default_discord_api_base(),
            bot_token: String::new(),
            channel_id: String::new(),
            public_key: None,
            login_max_attempts: default_login_max_attempts(),
            login_retry_delay_ms: default_login_retry_delay_ms(),
        }
    }
}

/// 인원 감시기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSettings {
    /// 폴링 주기 (초): 사이클 간격과 무관한 고정 주기
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 자동 시작/중지 기준 인원 (합계가 이 값 이상이면 시작)
    #[serde(default = "default_occupancy_threshold")]
    pub occupancy_threshold: u32,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            occupancy_threshold: default_occupancy_threshold(),
        }
    }
}

/// 운영자 명령 HTTP 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSettings {
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 포트
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접속 허용 (0.0.0.0 바인드)
    #[serde(default)]
    pub allow_external: bool,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_web_port(),
            allow_external: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_login_max_attempts() -> u32 {
    5
}

fn default_login_retry_delay_ms() -> u64 {
    5_000
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_occupancy_threshold() -> u32 {
    95
}

fn default_web_port() -> u16 {
    9191
}

impl AgentSettings {
    /// 설정 파일(선택) + 환경변수에서 로드하고 필수값을 검증한다.
    pub fn load(file: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!("시작 설정 파일: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
        );

        let settings: AgentSettings = builder
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| CoreError::Startup(format!("시작 설정 로드 실패: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    /// 필수 설정 4종 검증: 하나라도 비어 있으면 치명적 에러
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("remote.base_url", &self.remote.base_url),
            ("remote.api_token", &self.remote.api_token),
            ("discord.bot_token", &self.discord.bot_token),
            ("discord.channel_id", &self.discord.channel_id),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(CoreError::Startup(format!(
                "필수 설정 누락: {}",
                missing.join(", ")
            )));
        }

        if self.discord.login_max_attempts == 0 {
            return Err(CoreError::Startup(
                "discord.login_max_attempts는 1 이상이어야 합니다".to_string(),
            ));
        }

        if self.watchdog.poll_interval_secs == 0 {
            return Err(CoreError::Startup(
                "watchdog.poll_interval_secs는 1 이상이어야 합니다".to_string(),
            ));
        }

        Ok(())
    }

    /// 원격 API 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.request_timeout_ms)
    }

    /// 인원 감시 주기
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog.poll_interval_secs)
    }

    /// 로그인 재시도 간격
    pub fn login_retry_delay(&self) -> Duration {
        Duration::from_millis(self.discord.login_retry_delay_ms)
    }
}
