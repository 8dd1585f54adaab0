//! 상태 렌더러.
//!
//! 에이전트가 게시한 최신 [`StatusView`]를 채널의 상태 메시지 하나에 반영한다.
//! 메시지 식별자는 이 태스크만 소유하며, 없으면 생성하고 있으면 제자리 수정한다.

use pingwarden_core::error::CoreError;
use pingwarden_core::models::status::StatusView;
use pingwarden_core::ports::presenter::{MessageHandle, StatusPresenter};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 상태 렌더러
pub struct StatusRenderer {
    presenter: Arc<dyn StatusPresenter>,
    message: Option<MessageHandle>,
}

impl StatusRenderer {
    pub fn new(presenter: Arc<dyn StatusPresenter>) -> Self {
        Self {
            presenter,
            message: None,
        }
    }

    /// 현재 바인딩된 메시지
    pub fn message(&self) -> Option<&MessageHandle> {
        self.message.as_ref()
    }

    /// 뷰 1개 렌더링. 실패는 로그만 남기고 다음 변경 때 다시 시도된다.
    pub async fn render(&mut self, view: &StatusView) {
        if let Some(handle) = &self.message {
            match self.presenter.update(handle, view).await {
                Ok(()) => return,
                Err(CoreError::NotFound { .. }) => {
                    info!("상태 메시지 {}가 사라짐, 새로 생성", handle.as_str());
                    self.message = None;
                }
                Err(e) => {
                    warn!("상태 메시지 수정 실패 (rev {}): {e}", view.revision);
                    return;
                }
            }
        }

        match self.presenter.create(view).await {
            Ok(handle) => {
                debug!("상태 메시지 바인딩: {}", handle.as_str());
                self.message = Some(handle);
            }
            Err(e) => warn!("상태 메시지 생성 실패 (rev {}): {e}", view.revision),
        }
    }

    /// 렌더 루프. 게시자(에이전트)가 사라지면 종료한다.
    ///
    /// 렌더 중에 쌓인 변경은 최신 값 하나로 합쳐진다 (watch 채널).
    /// 에이전트가 종료 직전에 게시한 복원 결과까지 반영하고 끝난다.
    pub async fn run(mut self, mut views: watch::Receiver<StatusView>) {
        let initial = views.borrow_and_update().clone();
        self.render(&initial).await;

        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            self.render(&view).await;
        }

        info!("상태 렌더러 종료");
    }
}
