//! 채팅 플랫폼 상태 보드.
//!
//! `StatusPresenter` 포트 구현. 채널에 상태 메시지 하나를 만들고 이후에는 제자리 수정한다.
//! 버튼 `custom_id`는 [`ControlButton`]을 따르며, 활성화 여부는 [`Affordances`] 규칙을 따른다.

use async_trait::async_trait;
use pingwarden_core::config::DiscordSettings;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::command::{ControlButton, NumericField};
use pingwarden_core::models::status::{Affordances, StatusView};
use pingwarden_core::ports::presenter::{MessageHandle, StatusPresenter};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 실행 중 임베드 색상 (초록)
const COLOR_RUNNING: u32 = 0x2E_CC_71;

/// 대기 중 임베드 색상 (회색)
const COLOR_IDLE: u32 = 0x95_A5_A6;

/// 버튼 스타일
const STYLE_PRIMARY: u8 = 1;
const STYLE_SECONDARY: u8 = 2;
const STYLE_SUCCESS: u8 = 3;
const STYLE_DANGER: u8 = 4;

/// 봇 계정 정보 (로그인 확인용)
#[derive(Debug, Deserialize)]
struct BotUser {
    id: String,
    username: String,
}

/// 생성된 메시지 (ID만 필요)
#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

/// 채팅 플랫폼 상태 보드: `StatusPresenter` 포트 구현
pub struct DiscordStatusBoard {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    channel_id: String,
    login_max_attempts: u32,
    login_retry_delay: Duration,
}

impl DiscordStatusBoard {
    /// 설정으로 생성
    pub fn new(settings: &DiscordSettings, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            bot_token: settings.bot_token.clone(),
            channel_id: settings.channel_id.clone(),
            login_max_attempts: settings.login_max_attempts.max(1),
            login_retry_delay: Duration::from_millis(settings.login_retry_delay_ms),
        })
    }

    /// 봇 인증 헤더가 포함된 요청 빌더
    fn bot_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        self.client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.bot_token))
    }

    fn messages_path(&self) -> String {
        format!("/channels/{}/messages", self.channel_id)
    }

    /// 로그인 1회 시도
    async fn verify_credential(&self) -> Result<BotUser, CoreError> {
        let resp = self
            .bot_request(reqwest::Method::GET, "/users/@me")
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("로그인 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!("로그인 실패 ({status}): {text}")));
        }

        resp.json()
            .await
            .map_err(|e| CoreError::Auth(format!("봇 정보 파싱 실패: {e}")))
    }

    async fn check_response(
        &self,
        resp: reqwest::Response,
        message_id: Option<&str>,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            401 | 403 => Err(CoreError::Auth(format!("권한 없음 ({status}): {text}"))),
            404 => Err(CoreError::NotFound {
                resource_type: "Message".to_string(),
                id: message_id.unwrap_or(&self.channel_id).to_string(),
            }),
            _ => Err(CoreError::Presentation(format!(
                "메시지 요청 실패 ({status}): {text}"
            ))),
        }
    }
}

#[async_trait]
impl StatusPresenter for DiscordStatusBoard {
    /// 고정 간격으로 최대 `login_max_attempts`번 시도한다.
    async fn connect(&self) -> Result<(), CoreError> {
        let mut last_error = CoreError::Auth("로그인 시도 없음".to_string());

        for attempt in 1..=self.login_max_attempts {
            match self.verify_credential().await {
                Ok(user) => {
                    info!("표시 계층 로그인 성공: {} ({})", user.username, user.id);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "표시 계층 로그인 실패 (시도 {attempt}/{}): {e}",
                        self.login_max_attempts
                    );
                    last_error = e;
                    if attempt < self.login_max_attempts {
                        tokio::time::sleep(self.login_retry_delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn create(&self, view: &StatusView) -> Result<MessageHandle, CoreError> {
        let resp = self
            .bot_request(reqwest::Method::POST, &self.messages_path())
            .json(&message_payload(view))
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("상태 메시지 생성 실패: {e}")))?;

        let resp = self.check_response(resp, None).await?;
        let created: CreatedMessage = resp
            .json()
            .await
            .map_err(|e| CoreError::Presentation(format!("메시지 응답 파싱 실패: {e}")))?;

        debug!("상태 메시지 생성: {}", created.id);
        Ok(MessageHandle::new(created.id))
    }

    async fn update(&self, handle: &MessageHandle, view: &StatusView) -> Result<(), CoreError> {
        let path = format!("{}/{}", self.messages_path(), handle.as_str());
        let resp = self
            .bot_request(reqwest::Method::PATCH, &path)
            .json(&message_payload(view))
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("상태 메시지 수정 실패: {e}")))?;

        self.check_response(resp, Some(handle.as_str())).await?;
        debug!("상태 메시지 수정: {} (rev {})", handle.as_str(), view.revision);
        Ok(())
    }
}

/// 버튼 활성화 여부
fn button_enabled(button: ControlButton, affordances: &Affordances) -> bool {
    match button {
        ControlButton::Start => affordances.start,
        ControlButton::Stop => affordances.stop,
        ControlButton::ToggleAuto => affordances.toggle_auto,
        ControlButton::Edit(NumericField::Interval) => affordances.edit_interval,
        ControlButton::Edit(NumericField::Duration) => affordances.edit_duration,
        ControlButton::Edit(NumericField::Target) => affordances.edit_target,
        ControlButton::Edit(NumericField::DefaultThreshold) => affordances.edit_default_threshold,
    }
}

fn button(button: ControlButton, label: &str, style: u8, affordances: &Affordances) -> Value {
    json!({
        "type": 2,
        "style": style,
        "label": label,
        "custom_id": button.custom_id(),
        "disabled": !button_enabled(button, affordances),
    })
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "켜짐"
    } else {
        "꺼짐"
    }
}

/// 상태 메시지 본문 (임베드 + 버튼 2줄)
pub fn message_payload(view: &StatusView) -> Value {
    let config = &view.config;
    let a = &view.affordances;

    let state = if config.is_running {
        "🟢 실행 중"
    } else {
        "⚪ 대기"
    };
    let current = view
        .current_threshold
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "알 수 없음".to_string());

    let embed = json!({
        "title": "핑 사이클 제어",
        "color": if config.is_running { COLOR_RUNNING } else { COLOR_IDLE },
        "fields": [
            { "name": "상태", "value": state, "inline": true },
            { "name": "자동 모드", "value": on_off(config.auto_mode), "inline": true },
            { "name": "서버 임계값", "value": current, "inline": true },
            { "name": NumericField::Interval.label(), "value": config.interval_minutes.to_string(), "inline": true },
            { "name": NumericField::Duration.label(), "value": config.duration_seconds.to_string(), "inline": true },
            { "name": NumericField::Target.label(), "value": config.target_threshold.to_string(), "inline": true },
            { "name": NumericField::DefaultThreshold.label(), "value": config.default_threshold.to_string(), "inline": true },
        ],
        "footer": { "text": format!("rev {}", view.revision) },
        "timestamp": view.updated_at,
    });

    let auto_style = if config.auto_mode {
        STYLE_PRIMARY
    } else {
        STYLE_SECONDARY
    };

    let controls = json!({
        "type": 1,
        "components": [
            button(ControlButton::Start, "시작", STYLE_SUCCESS, a),
            button(ControlButton::Stop, "중지", STYLE_DANGER, a),
            button(ControlButton::ToggleAuto, &format!("자동 모드: {}", on_off(config.auto_mode)), auto_style, a),
        ],
    });

    let edits: Vec<Value> = NumericField::ALL
        .into_iter()
        .map(|field| button(ControlButton::Edit(field), field.label(), STYLE_SECONDARY, a))
        .collect();

    json!({
        "embeds": [embed],
        "components": [controls, { "type": 1, "components": edits }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pingwarden_core::config::ControlConfig;

    fn settings_for(server: &mockito::ServerGuard, attempts: u32) -> DiscordSettings {
        DiscordSettings {
            api_base: server.url(),
            bot_token: "bot-token".to_string(),
            channel_id: "chan-1".to_string(),
            public_key: None,
            login_max_attempts: attempts,
            login_retry_delay_ms: 10,
        }
    }

    fn find_button<'a>(payload: &'a Value, custom_id: &str) -> &'a Value {
        payload["components"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|row| row["components"].as_array().unwrap().iter())
            .find(|b| b["custom_id"] == custom_id)
            .unwrap()
    }

    #[test]
    fn payload_disables_buttons_when_running() {
        let view = StatusView::new(ControlConfig {
            is_running: true,
            ..ControlConfig::default()
        });
        let payload = message_payload(&view);

        assert_eq!(find_button(&payload, "pw:start")["disabled"], true);
        assert_eq!(find_button(&payload, "pw:stop")["disabled"], false);
        assert_eq!(find_button(&payload, "pw:edit:interval")["disabled"], true);
        assert_eq!(find_button(&payload, "pw:auto")["disabled"], false);
    }

    #[test]
    fn payload_enables_edits_when_idle() {
        let payload = message_payload(&StatusView::new(ControlConfig::default()));

        assert_eq!(find_button(&payload, "pw:start")["disabled"], false);
        assert_eq!(find_button(&payload, "pw:stop")["disabled"], true);
        for field in NumericField::ALL {
            let id = ControlButton::Edit(field).custom_id();
            assert_eq!(find_button(&payload, &id)["disabled"], false);
        }
    }

    #[tokio::test]
    async fn connect_gives_up_after_max_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/@me")
            .match_header("authorization", "Bot bot-token")
            .with_status(401)
            .with_body("401: Unauthorized")
            .expect(3)
            .create_async()
            .await;

        let board = DiscordStatusBoard::new(&settings_for(&server, 3), Duration::from_secs(5))
            .unwrap();
        let err = board.connect().await.unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connect_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/@me")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"42","username":"pingwarden"}"#)
            .expect(1)
            .create_async()
            .await;

        let board = DiscordStatusBoard::new(&settings_for(&server, 5), Duration::from_secs(5))
            .unwrap();
        board.connect().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_then_update_in_place() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/channels/chan-1/messages")
            .match_body(Matcher::PartialJson(json!({ "embeds": [{ "title": "핑 사이클 제어" }] })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg-9","channel_id":"chan-1"}"#)
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/channels/chan-1/messages/msg-9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg-9"}"#)
            .create_async()
            .await;

        let board = DiscordStatusBoard::new(&settings_for(&server, 1), Duration::from_secs(5))
            .unwrap();
        let view = StatusView::new(ControlConfig::default());

        let handle = board.create(&view).await.unwrap();
        assert_eq!(handle.as_str(), "msg-9");
        board.update(&handle, &view).await.unwrap();

        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn update_deleted_message_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/channels/chan-1/messages/gone")
            .with_status(404)
            .with_body(r#"{"message":"Unknown Message","code":10008}"#)
            .create_async()
            .await;

        let board = DiscordStatusBoard::new(&settings_for(&server, 1), Duration::from_secs(5))
            .unwrap();
        let err = board
            .update(
                &MessageHandle::new("gone"),
                &StatusView::new(ControlConfig::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
