//! 에이전트: 직렬 요청 큐와 단일 소비자.
//!
//! 운영자 명령, 사이클 틱, 복원 시각, 감시 틱이 모두 같은 큐로 들어오고
//! [`Agent::run`] 하나만 꺼내 처리하므로 처리 도중 다른 요청이 끼어들 수 없다.

use async_trait::async_trait;
use pingwarden_core::config::WatchdogSettings;
use pingwarden_core::config_store::ConfigStore;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::command::OperatorCommand;
use pingwarden_core::models::status::StatusView;
use pingwarden_core::ports::command::CommandPort;
use pingwarden_core::ports::remote_control::RemoteControl;
use pingwarden_core::ports::timer::TimerDriver;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::dispatcher::CommandDispatcher;

/// 큐 요청
#[derive(Debug)]
pub enum AgentRequest {
    /// 운영자 명령 (처리 결과를 `reply`로 돌려준다)
    Command {
        command: OperatorCommand,
        reply: oneshot::Sender<Result<StatusView, CoreError>>,
    },
    /// 반복 타이머 발화 → 낮춤 단계 (`arm`: 보낸 타이머의 예약 번호)
    CycleTick { arm: u64 },
    /// 유지 시간 경과 → 복원 단계
    RestoreDue { cycle: u64 },
    /// 인원 감시 틱
    WatchdogTick,
    /// 종료 (예약된 복원 실행 후 루프 탈출)
    Shutdown,
}

/// 에이전트 (큐 소비자)
pub struct Agent {
    dispatcher: CommandDispatcher,
    requests_rx: mpsc::UnboundedReceiver<AgentRequest>,
}

/// 에이전트 송신 핸들: `CommandPort` 구현
#[derive(Clone)]
pub struct AgentHandle {
    requests: mpsc::UnboundedSender<AgentRequest>,
    status: watch::Receiver<StatusView>,
}

impl Agent {
    /// 에이전트와 핸들 생성
    pub fn new(
        store: ConfigStore,
        remote: Arc<dyn RemoteControl>,
        timers: Arc<dyn TimerDriver>,
        watchdog_settings: &WatchdogSettings,
    ) -> (Self, AgentHandle) {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusView::new(store.get().clone()));

        let dispatcher = CommandDispatcher::new(
            store,
            remote,
            timers,
            watchdog_settings,
            requests_tx.clone(),
            status_tx,
        );

        let agent = Self {
            dispatcher,
            requests_rx,
        };
        let handle = AgentHandle {
            requests: requests_tx,
            status: status_rx,
        };
        (agent, handle)
    }

    /// 큐 처리 루프. `Shutdown` 요청을 받으면 정리 후 반환한다.
    pub async fn run(mut self) {
        info!("에이전트 시작");
        self.dispatcher.startup().await;

        while let Some(request) = self.requests_rx.recv().await {
            if !self.dispatcher.handle(request).await {
                debug!("종료 요청 수신");
                break;
            }
        }

        self.dispatcher.shutdown().await;
        info!("에이전트 종료");
    }
}

impl AgentHandle {
    /// 상태 뷰 변경 구독 (렌더러용)
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.status.clone()
    }

    /// 종료 요청
    pub fn shutdown(&self) {
        let _ = self.requests.send(AgentRequest::Shutdown);
    }
}

#[async_trait]
impl CommandPort for AgentHandle {
    async fn submit(&self, command: OperatorCommand) -> Result<StatusView, CoreError> {
        let (reply, response) = oneshot::channel();

        self.requests
            .send(AgentRequest::Command { command, reply })
            .map_err(|_| CoreError::Internal("에이전트가 종료됨".to_string()))?;

        response
            .await
            .map_err(|_| CoreError::Internal("에이전트가 응답 없이 종료됨".to_string()))?
    }

    fn status(&self) -> StatusView {
        self.status.borrow().clone()
    }
}
