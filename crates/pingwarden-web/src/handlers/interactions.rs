//! 채팅 플랫폼 인터랙션 웹훅.
//!
//! 상태 메시지의 버튼과 숫자 입력 모달이 이 엔드포인트로 들어온다.
//! 명령 결과는 렌더 루프가 상태 메시지를 수정해 보여주므로,
//! 성공 응답은 "메시지 수정 지연"(type 6)만 돌려준다.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::command::{ControlButton, NumericField, OperatorCommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::AppState;

/// 인터랙션 종류
const INTERACTION_PING: u8 = 1;
const INTERACTION_COMPONENT: u8 = 3;
const INTERACTION_MODAL_SUBMIT: u8 = 5;

/// 응답 종류
const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED_UPDATE: u8 = 6;
const RESPONSE_MODAL: u8 = 9;

/// 본인에게만 보이는 메시지 플래그
const FLAG_EPHEMERAL: u32 = 1 << 6;

/// 모달 텍스트 입력 `custom_id`
const MODAL_INPUT_ID: &str = "value";

#[derive(Debug, Deserialize)]
struct Interaction {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<InteractionData>,
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    #[serde(default)]
    custom_id: Option<String>,
    /// 모달 제출 시 입력 행
    #[serde(default)]
    components: Vec<ModalRow>,
}

#[derive(Debug, Deserialize)]
struct ModalRow {
    #[serde(default)]
    components: Vec<ModalInput>,
}

#[derive(Debug, Deserialize)]
struct ModalInput {
    #[serde(default)]
    value: Option<String>,
}

/// POST /interactions
pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("인터랙션 웹훅 비활성화".to_string()))?;

    let signature = header_str(&headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(&headers, TIMESTAMP_HEADER)?;
    verifier.verify(timestamp, &body, signature).map_err(|e| {
        warn!("인터랙션 서명 거부: {e}");
        ApiError::Unauthorized("invalid request signature".to_string())
    })?;

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("인터랙션 파싱 실패: {e}")))?;
    debug!("인터랙션 수신: type={}", interaction.kind);

    match interaction.kind {
        INTERACTION_PING => Ok(Json(json!({ "type": RESPONSE_PONG }))),
        INTERACTION_COMPONENT => on_button(&state, interaction.data).await,
        INTERACTION_MODAL_SUBMIT => on_modal_submit(&state, interaction.data).await,
        other => Err(ApiError::BadRequest(format!(
            "지원하지 않는 인터랙션 종류: {other}"
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("{name} 헤더 없음")))
}

fn custom_id(data: &Option<InteractionData>) -> Result<&str, ApiError> {
    data.as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("custom_id 없음".to_string()))
}

async fn on_button(
    state: &AppState,
    data: Option<InteractionData>,
) -> Result<Json<Value>, ApiError> {
    let id = custom_id(&data)?;
    let button = ControlButton::parse(id)
        .ok_or_else(|| ApiError::BadRequest(format!("알 수 없는 버튼: {id}")))?;

    let command = match button {
        ControlButton::Start => OperatorCommand::Start,
        ControlButton::Stop => OperatorCommand::Stop,
        ControlButton::ToggleAuto => OperatorCommand::ToggleAuto,
        ControlButton::Edit(field) => return Ok(Json(edit_modal(state, field))),
    };

    Ok(Json(submit_reply(state, command).await))
}

async fn on_modal_submit(
    state: &AppState,
    data: Option<InteractionData>,
) -> Result<Json<Value>, ApiError> {
    let id = custom_id(&data)?;
    let field = ControlButton::parse_modal(id)
        .ok_or_else(|| ApiError::BadRequest(format!("알 수 없는 모달: {id}")))?;

    let raw = data
        .as_ref()
        .and_then(|d| d.components.first())
        .and_then(|row| row.components.first())
        .and_then(|input| input.value.clone())
        .unwrap_or_default();

    Ok(Json(submit_reply(state, field.command(raw)).await))
}

/// 명령 제출 후 인터랙션 응답 생성
async fn submit_reply(state: &AppState, command: OperatorCommand) -> Value {
    match state.commands.submit(command).await {
        Ok(_) => json!({ "type": RESPONSE_DEFERRED_UPDATE }),
        Err(CoreError::Validation { message, .. }) => ephemeral(&message),
        Err(e) => {
            warn!("인터랙션 명령 처리 실패: {e}");
            ephemeral(&format!("명령 처리 실패: {e}"))
        }
    }
}

fn ephemeral(content: &str) -> Value {
    json!({
        "type": RESPONSE_MESSAGE,
        "data": { "content": content, "flags": FLAG_EPHEMERAL },
    })
}

/// 숫자 입력 모달 (현재 값을 미리 채운다)
fn edit_modal(state: &AppState, field: NumericField) -> Value {
    let config = state.commands.status().config;
    let current = match field {
        NumericField::Interval => config.interval_minutes,
        NumericField::Duration => config.duration_seconds,
        NumericField::Target => config.target_threshold,
        NumericField::DefaultThreshold => config.default_threshold,
    };

    json!({
        "type": RESPONSE_MODAL,
        "data": {
            "custom_id": ControlButton::modal_id(field),
            "title": field.label(),
            "components": [{
                "type": 1,
                "components": [{
                    "type": 4,
                    "custom_id": MODAL_INPUT_ID,
                    "label": field.label(),
                    "style": 1,
                    "required": true,
                    "value": current.to_string(),
                }],
            }],
        },
    })
}
