//! 운영자 명령 포트.
//!
//! 구현: `pingwarden-control` crate (직렬 요청 큐의 송신 핸들)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::command::OperatorCommand;
use crate::models::status::StatusView;

/// 운영자 명령 수신 인터페이스
#[async_trait]
pub trait CommandPort: Send + Sync {
    /// 명령 제출 후 처리 결과 뷰 반환
    ///
    /// 입력 오류는 `CoreError::Validation` (상태 변경 없음).
    async fn submit(&self, command: OperatorCommand) -> Result<StatusView, CoreError>;

    /// 마지막으로 게시된 상태 뷰
    fn status(&self) -> StatusView;
}
