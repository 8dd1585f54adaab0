//! PINGWARDEN 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입을 그대로 반환하거나 자체 에러에서 `From<CoreError>`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 운영자 입력 검증 실패 (상태 변경 없음)
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유 (사용자에게 그대로 노출)
        message: String,
    },

    /// 원격 제어 API 실패 (비 2xx 또는 응답 본문의 failed 플래그)
    #[error("원격 API 에러 ({}): {message}", status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()))]
    Remote {
        /// HTTP 상태 코드 (애플리케이션 레벨 실패면 None)
        status: Option<u16>,
        /// 실패 사유
        message: String,
    },

    /// 제어 설정 파일 읽기/쓰기 실패
    #[error("영속화 에러: {0}")]
    Persistence(String),

    /// 시작 시 필수 설정 누락 등 치명적 에러
    #[error("시작 에러: {0}")]
    Startup(String),

    /// 인증 실패 (자격증명 오류 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 표시 계층(채팅 플랫폼) 에러
    #[error("표시 계층 에러: {0}")]
    Presentation(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Message")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 검증 에러 생성 헬퍼
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 운영자 입력 오류인지 여부
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation { .. })
    }
}
