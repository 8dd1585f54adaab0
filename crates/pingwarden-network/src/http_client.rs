//! 원격 제어 REST API 클라이언트.
//!
//! `RemoteControl` 포트 구현. Bearer 인증 헤더 주입 + 응답 봉투(`failed` 플래그) 검사.
//! 재시도 없음: 실패한 호출은 다음 틱에서 자연히 다시 시도된다.

use async_trait::async_trait;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::occupancy::Occupancy;
use pingwarden_core::ports::remote_control::RemoteControl;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// 임계값 조회 경로
const GET_THRESHOLD_PATH: &str = "/api/get_max_ping_autokick";

/// 임계값 변경 경로
const SET_THRESHOLD_PATH: &str = "/api/set_max_ping_autokick";

/// 인원 조회 경로
const GET_OCCUPANCY_PATH: &str = "/api/get_gamestate";

/// 서버 응답 봉투
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 임계값 응답: 숫자 또는 `{ "max_ms": n }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThresholdResult {
    Value(u32),
    Object { max_ms: u32 },
}

impl ThresholdResult {
    fn value(&self) -> u32 {
        match self {
            ThresholdResult::Value(v) => *v,
            ThresholdResult::Object { max_ms } => *max_ms,
        }
    }
}

/// 게임 상태 응답 (필요한 필드만)
#[derive(Debug, Deserialize)]
struct GameState {
    #[serde(alias = "sideA_count")]
    num_allied_players: u32,
    #[serde(alias = "sideB_count")]
    num_axis_players: u32,
}

/// 원격 제어 API 클라이언트: `RemoteControl` 포트 구현
pub struct RemoteControlClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl RemoteControlClient {
    /// 새 클라이언트 생성
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Authorization 헤더가 포함된 요청 빌더 반환
    fn authorized_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(&self.api_token)
    }

    /// 요청 전송 → 상태 코드 확인 → 봉투 해제
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<Option<T>, CoreError> {
        let resp = request.send().await.map_err(|e| CoreError::Remote {
            status: None,
            message: format!("{operation} 요청 실패: {e}"),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_else(|e| {
                warn!("응답 본문 읽기 실패: {e}");
                String::new()
            });
            return Err(CoreError::Remote {
                status: Some(status.as_u16()),
                message: format!("{operation} 실패: {text}"),
            });
        }

        let envelope: Envelope<T> = resp.json().await.map_err(|e| CoreError::Remote {
            status: Some(status.as_u16()),
            message: format!("{operation} 응답 파싱 실패: {e}"),
        })?;

        if envelope.failed {
            return Err(CoreError::Remote {
                status: None,
                message: format!(
                    "{operation} 실패: {}",
                    envelope.error.unwrap_or_else(|| "failed=true".to_string())
                ),
            });
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl RemoteControl for RemoteControlClient {
    async fn read_threshold(&self) -> Result<u32, CoreError> {
        let request = self.authorized_request(reqwest::Method::GET, GET_THRESHOLD_PATH);
        let result: Option<ThresholdResult> = self.execute(request, "임계값 조회").await?;

        let value = result.map(|r| r.value()).ok_or_else(|| CoreError::Remote {
            status: None,
            message: "임계값 조회 응답에 result 없음".to_string(),
        })?;

        debug!("현재 임계값: {value}ms");
        Ok(value)
    }

    async fn write_threshold(&self, max_ms: u32) -> Result<u32, CoreError> {
        debug!("임계값 변경 요청: {max_ms}ms");

        let body = serde_json::json!({ "max_ms": max_ms });
        let request = self
            .authorized_request(reqwest::Method::POST, SET_THRESHOLD_PATH)
            .json(&body);
        let result: Option<ThresholdResult> = self.execute(request, "임계값 변경").await?;

        // 결과 값을 돌려주지 않는 서버는 요청 값을 그대로 확인값으로 본다
        let confirmed = result.map(|r| r.value()).unwrap_or(max_ms);
        debug!("임계값 변경 완료: {confirmed}ms");
        Ok(confirmed)
    }

    async fn read_occupancy(&self) -> Result<Occupancy, CoreError> {
        let request = self.authorized_request(reqwest::Method::GET, GET_OCCUPANCY_PATH);
        let state: Option<GameState> = self.execute(request, "인원 조회").await?;

        let state = state.ok_or_else(|| CoreError::Remote {
            status: None,
            message: "인원 조회 응답에 result 없음".to_string(),
        })?;

        let occupancy = Occupancy::new(state.num_allied_players, state.num_axis_players);
        debug!(
            "현재 인원: {} + {} = {}",
            occupancy.side_a,
            occupancy.side_b,
            occupancy.total()
        );
        Ok(occupancy)
    }
}
