//! 상태 조회 + 운영자 명령 API.

use axum::extract::State;
use axum::Json;
use pingwarden_core::models::command::{NumericField, OperatorCommand};
use pingwarden_core::models::status::StatusView;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// 숫자 설정 요청 본문. 값은 운영자가 입력한 원문 그대로.
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub value: String,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.commands.status())
}

async fn submit(state: &AppState, command: OperatorCommand) -> Result<Json<StatusView>, ApiError> {
    debug!("API 명령: {}", command.name());
    let view = state.commands.submit(command).await?;
    Ok(Json(view))
}

/// POST /api/commands/start
pub async fn post_start(State(state): State<AppState>) -> Result<Json<StatusView>, ApiError> {
    submit(&state, OperatorCommand::Start).await
}

/// POST /api/commands/stop
pub async fn post_stop(State(state): State<AppState>) -> Result<Json<StatusView>, ApiError> {
    submit(&state, OperatorCommand::Stop).await
}

/// POST /api/commands/auto
pub async fn post_toggle_auto(
    State(state): State<AppState>,
) -> Result<Json<StatusView>, ApiError> {
    submit(&state, OperatorCommand::ToggleAuto).await
}

/// POST /api/commands/interval
pub async fn post_interval(
    State(state): State<AppState>,
    Json(body): Json<ValueRequest>,
) -> Result<Json<StatusView>, ApiError> {
    submit(&state, NumericField::Interval.command(body.value)).await
}

/// POST /api/commands/duration
pub async fn post_duration(
    State(state): State<AppState>,
    Json(body): Json<ValueRequest>,
) -> Result<Json<StatusView>, ApiError> {
    submit(&state, NumericField::Duration.command(body.value)).await
}

/// POST /api/commands/target
pub async fn post_target(
    State(state): State<AppState>,
    Json(body): Json<ValueRequest>,
) -> Result<Json<StatusView>, ApiError> {
    submit(&state, NumericField::Target.command(body.value)).await
}

/// POST /api/commands/default-threshold
pub async fn post_default_threshold(
    State(state): State<AppState>,
    Json(body): Json<ValueRequest>,
) -> Result<Json<StatusView>, ApiError> {
    submit(&state, NumericField::DefaultThreshold.command(body.value)).await
}
