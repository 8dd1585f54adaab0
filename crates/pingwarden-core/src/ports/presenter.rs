//! 상태 표시 포트.
//!
//! 구현: `pingwarden-network` crate (채팅 플랫폼 REST)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::status::StatusView;

/// 표시 계층이 발급한 상태 메시지 식별자
///
/// 코어는 내용을 해석하지 않고 존재 여부로 생성/수정만 결정한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(String);

impl MessageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 상태 메시지 표시 인터페이스
#[async_trait]
pub trait StatusPresenter: Send + Sync {
    /// 표시 계층 로그인/연결 확인
    async fn connect(&self) -> Result<(), CoreError>;

    /// 새 상태 메시지 생성
    async fn create(&self, view: &StatusView) -> Result<MessageHandle, CoreError>;

    /// 기존 메시지 제자리 수정
    ///
    /// 메시지가 사라졌으면 `CoreError::NotFound`를 반환한다.
    async fn update(&self, handle: &MessageHandle, view: &StatusView) -> Result<(), CoreError>;
}
