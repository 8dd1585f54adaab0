//! 운영자 명령 모델.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 운영자 명령
///
/// 숫자 명령의 값은 운영자가 입력한 원문 그대로 전달되고, 디스패처에서 검증한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// 핑 사이클 수동 시작
    Start,
    /// 핑 사이클 수동 중지 (평상시 임계값 복원 포함)
    Stop,
    /// 사이클 간격 변경 (분)
    SetInterval(String),
    /// 유지 시간 변경 (초)
    SetDuration(String),
    /// 사이클 임계값 변경 (ms)
    SetTarget(String),
    /// 평상시 임계값 변경 (ms)
    SetDefaultThreshold(String),
    /// 자동 모드 전환
    ToggleAuto,
}

impl OperatorCommand {
    /// 로그용 명령 이름
    pub fn name(&self) -> &'static str {
        match self {
            OperatorCommand::Start => "start",
            OperatorCommand::Stop => "stop",
            OperatorCommand::SetInterval(_) => "set_interval",
            OperatorCommand::SetDuration(_) => "set_duration",
            OperatorCommand::SetTarget(_) => "set_target",
            OperatorCommand::SetDefaultThreshold(_) => "set_default_threshold",
            OperatorCommand::ToggleAuto => "toggle_auto",
        }
    }
}

/// 숫자 입력을 받는 설정 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumericField {
    Interval,
    Duration,
    Target,
    DefaultThreshold,
}

impl NumericField {
    /// 모든 필드
    pub const ALL: [NumericField; 4] = [
        NumericField::Interval,
        NumericField::Duration,
        NumericField::Target,
        NumericField::DefaultThreshold,
    ];

    /// 제어 레코드 필드명 (검증 에러에 노출)
    pub fn field_name(self) -> &'static str {
        match self {
            NumericField::Interval => "intervalMinutes",
            NumericField::Duration => "durationSeconds",
            NumericField::Target => "targetThreshold",
            NumericField::DefaultThreshold => "defaultThreshold",
        }
    }

    /// URL/식별자용 슬러그
    pub fn slug(self) -> &'static str {
        match self {
            NumericField::Interval => "interval",
            NumericField::Duration => "duration",
            NumericField::Target => "target",
            NumericField::DefaultThreshold => "default-threshold",
        }
    }

    /// 슬러그에서 필드 복원
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.slug() == slug)
    }

    /// 사용자 표시 이름
    pub fn label(self) -> &'static str {
        match self {
            NumericField::Interval => "사이클 간격 (분)",
            NumericField::Duration => "유지 시간 (초)",
            NumericField::Target => "사이클 임계값 (ms)",
            NumericField::DefaultThreshold => "평상시 임계값 (ms)",
        }
    }

    /// 입력값으로 명령 생성
    pub fn command(self, raw: impl Into<String>) -> OperatorCommand {
        let raw = raw.into();
        match self {
            NumericField::Interval => OperatorCommand::SetInterval(raw),
            NumericField::Duration => OperatorCommand::SetDuration(raw),
            NumericField::Target => OperatorCommand::SetTarget(raw),
            NumericField::DefaultThreshold => OperatorCommand::SetDefaultThreshold(raw),
        }
    }
}

/// 버튼/모달 식별자 접두사
const CUSTOM_ID_PREFIX: &str = "pw";

/// 상태 메시지의 버튼
///
/// 표시 계층이 버튼을 만들고, 명령 표면이 눌린 버튼을 명령으로 되돌릴 때 같은 식별자를 쓴다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlButton {
    Start,
    Stop,
    ToggleAuto,
    /// 숫자 입력 모달 열기
    Edit(NumericField),
}

impl ControlButton {
    /// 버튼 `custom_id` (예: `pw:start`, `pw:edit:interval`)
    pub fn custom_id(self) -> String {
        match self {
            ControlButton::Start => format!("{CUSTOM_ID_PREFIX}:start"),
            ControlButton::Stop => format!("{CUSTOM_ID_PREFIX}:stop"),
            ControlButton::ToggleAuto => format!("{CUSTOM_ID_PREFIX}:auto"),
            ControlButton::Edit(field) => format!("{CUSTOM_ID_PREFIX}:edit:{}", field.slug()),
        }
    }

    /// `custom_id`에서 버튼 복원
    pub fn parse(custom_id: &str) -> Option<Self> {
        let rest = custom_id.strip_prefix(CUSTOM_ID_PREFIX)?.strip_prefix(':')?;
        match rest {
            "start" => Some(ControlButton::Start),
            "stop" => Some(ControlButton::Stop),
            "auto" => Some(ControlButton::ToggleAuto),
            _ => rest
                .strip_prefix("edit:")
                .and_then(NumericField::from_slug)
                .map(ControlButton::Edit),
        }
    }

    /// 숫자 입력 모달 `custom_id`
    pub fn modal_id(field: NumericField) -> String {
        format!("{CUSTOM_ID_PREFIX}:modal:{}", field.slug())
    }

    /// 모달 `custom_id`에서 필드 복원
    pub fn parse_modal(custom_id: &str) -> Option<NumericField> {
        custom_id
            .strip_prefix(CUSTOM_ID_PREFIX)?
            .strip_prefix(":modal:")
            .and_then(NumericField::from_slug)
    }
}

/// 운영자 입력을 양의 정수로 파싱한다.
///
/// 앞뒤 공백만 허용. 숫자가 아니거나 0 이하면 `Validation` 에러.
pub fn parse_positive(field: &str, raw: &str) -> Result<u32, CoreError> {
    let trimmed = raw.trim();

    let value: i64 = trimmed.parse().map_err(|_| {
        CoreError::validation(field, format!("숫자를 입력하세요 (입력값: {trimmed:?})"))
    })?;

    if value <= 0 {
        return Err(CoreError::validation(
            field,
            format!("0보다 큰 값을 입력하세요 (입력값: {value})"),
        ));
    }

    u32::try_from(value)
        .map_err(|_| CoreError::validation(field, format!("값이 너무 큽니다 (입력값: {value})")))
}
