//! 요청 디스패처.
//!
//! 제어 레코드, 핑 사이클, 인원 감시기를 소유하는 유일한 변경 주체.
//! 에이전트 큐에서 꺼낸 요청 하나를 끝까지(저장 포함) 처리한 뒤 다음 요청으로 넘어간다.
//!
//! 운영자 명령 처리 순서: 검증 → 레코드 변경 → 저장 → 사이클/감시기 구동 → 상태 게시.

use pingwarden_core::config::{ControlConfig, WatchdogSettings};
use pingwarden_core::config_store::ConfigStore;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::command::{parse_positive, NumericField, OperatorCommand};
use pingwarden_core::models::status::StatusView;
use pingwarden_core::ports::remote_control::RemoteControl;
use pingwarden_core::ports::timer::TimerDriver;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::agent::AgentRequest;
use crate::ping_cycle::PingCycleController;
use crate::watchdog::{OccupancyWatchdog, WatchdogDecision};

/// 요청 디스패처
pub struct CommandDispatcher {
    store: ConfigStore,
    cycle: PingCycleController,
    watchdog: OccupancyWatchdog,
    remote: Arc<dyn RemoteControl>,
    requests: mpsc::UnboundedSender<AgentRequest>,
    view: StatusView,
    status_tx: watch::Sender<StatusView>,
}

impl CommandDispatcher {
    pub fn new(
        store: ConfigStore,
        remote: Arc<dyn RemoteControl>,
        timers: Arc<dyn TimerDriver>,
        watchdog_settings: &WatchdogSettings,
        requests: mpsc::UnboundedSender<AgentRequest>,
        status_tx: watch::Sender<StatusView>,
    ) -> Self {
        let cycle = PingCycleController::new(timers.clone(), remote.clone(), requests.clone());
        let watchdog =
            OccupancyWatchdog::new(watchdog_settings, timers, remote.clone(), requests.clone());
        let view = StatusView::new(store.get().clone());

        Self {
            store,
            cycle,
            watchdog,
            remote,
            requests,
            view,
            status_tx,
        }
    }

    /// 현재 레코드
    pub fn config(&self) -> &ControlConfig {
        self.store.get()
    }

    /// 마지막으로 게시한 뷰
    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn cycle(&self) -> &PingCycleController {
        &self.cycle
    }

    pub fn watchdog(&self) -> &OccupancyWatchdog {
        &self.watchdog
    }

    /// 요청 1개 처리. `Shutdown`이면 false.
    pub async fn handle(&mut self, request: AgentRequest) -> bool {
        match request {
            AgentRequest::Command { command, reply } => {
                let result = self.execute(command).await;
                // 응답을 기다리던 쪽이 사라졌어도 상태 변경은 이미 반영됐다
                let _ = reply.send(result);
            }
            AgentRequest::CycleTick { arm } => self.on_cycle_tick(arm).await,
            AgentRequest::RestoreDue { cycle } => self.on_restore_due(cycle).await,
            AgentRequest::WatchdogTick => self.on_watchdog_tick().await,
            AgentRequest::Shutdown => return false,
        }
        true
    }

    /// 에이전트 시작 처리
    ///
    /// 서버 임계값을 1회 읽어 표시하고, 감시기를 예약하고,
    /// 저장된 레코드가 실행 중이면 사이클을 재개한다.
    pub async fn startup(&mut self) {
        let mut threshold = match self.remote.read_threshold().await {
            Ok(value) => {
                info!("현재 서버 임계값: {value}ms");
                Some(value)
            }
            Err(e) => {
                warn!("서버 임계값 조회 실패: {e}");
                None
            }
        };

        self.watchdog.arm();

        let config = self.store.get().clone();
        if config.is_running {
            info!("저장된 레코드가 실행 중 상태, 핑 사이클 재개");
            if let Some(value) = self.cycle.start(&config).await {
                threshold = Some(value);
            }
        }

        self.publish(threshold);
    }

    /// 에이전트 종료 처리: 타이머를 모두 취소하고 예약된 복원은 즉시 실행한다.
    pub async fn shutdown(&mut self) {
        self.cycle.stop();
        self.watchdog.disarm();

        let config = self.store.get().clone();
        if let Some(value) = self.cycle.flush_restore(&config).await {
            self.publish(Some(value));
        }
        info!("디스패처 종료");
    }

    // ============================================================
    // 운영자 명령
    // ============================================================

    /// 운영자 명령 실행. 입력 오류면 상태를 건드리지 않고 `Validation` 에러.
    pub async fn execute(&mut self, command: OperatorCommand) -> Result<StatusView, CoreError> {
        debug!("명령 수신: {}", command.name());

        match command {
            OperatorCommand::Start => self.manual_start().await,
            OperatorCommand::Stop => self.manual_stop().await,
            OperatorCommand::SetInterval(raw) => {
                self.set_numeric(NumericField::Interval, &raw).await?
            }
            OperatorCommand::SetDuration(raw) => {
                self.set_numeric(NumericField::Duration, &raw).await?
            }
            OperatorCommand::SetTarget(raw) => self.set_numeric(NumericField::Target, &raw).await?,
            OperatorCommand::SetDefaultThreshold(raw) => {
                self.set_numeric(NumericField::DefaultThreshold, &raw)
                    .await?
            }
            OperatorCommand::ToggleAuto => self.toggle_auto(),
        }

        Ok(self.view.clone())
    }

    /// 자동 모드와 무관하게 즉시 시작
    async fn manual_start(&mut self) {
        self.mutate(|c| c.is_running = true);
        let config = self.store.get().clone();
        let confirmed = self.cycle.start(&config).await;
        info!("수동 시작");
        self.publish(confirmed);
    }

    /// 자동 모드와 무관하게 즉시 중지하고 평상시 임계값을 복원한다
    async fn manual_stop(&mut self) {
        self.mutate(|c| c.is_running = false);
        self.cycle.stop();
        let confirmed = self.restore_default().await;
        info!("수동 중지");
        self.publish(confirmed);
    }

    async fn set_numeric(&mut self, field: NumericField, raw: &str) -> Result<(), CoreError> {
        let value = parse_positive(field.field_name(), raw)?;

        self.mutate(|c| match field {
            NumericField::Interval => c.interval_minutes = value,
            NumericField::Duration => c.duration_seconds = value,
            NumericField::Target => c.target_threshold = value,
            NumericField::DefaultThreshold => c.default_threshold = value,
        });
        info!("{} = {value}", field.field_name());

        let mut confirmed = None;
        // 살아 있는 타이머는 간격을 자동으로 바꾸지 않으므로 다시 시작한다
        if field == NumericField::Interval && self.cycle.is_armed() {
            let config = self.store.get().clone();
            confirmed = self.cycle.start(&config).await;
        }

        self.publish(confirmed);
        Ok(())
    }

    fn toggle_auto(&mut self) {
        self.mutate(|c| c.auto_mode = !c.auto_mode);
        let enabled = self.store.get().auto_mode;
        info!("자동 모드: {}", if enabled { "켜짐" } else { "꺼짐" });

        if enabled {
            // 다음 주기를 기다리지 않고 바로 한 번 판단
            let _ = self.requests.send(AgentRequest::WatchdogTick);
        }

        self.publish(None);
    }

    // ============================================================
    // 타이머 요청
    // ============================================================

    async fn on_cycle_tick(&mut self, arm: u64) {
        // 취소 직전에 큐에 들어간 틱 (중지 또는 재예약)
        if !self.cycle.is_current_tick(arm) {
            debug!("취소된 반복 타이머({arm})의 틱 무시");
            return;
        }

        let config = self.store.get().clone();
        let confirmed = self.cycle.lower(&config).await;
        self.publish(confirmed);
    }

    async fn on_restore_due(&mut self, cycle: u64) {
        let config = self.store.get().clone();
        if let Some(value) = self.cycle.restore_due(cycle, &config).await {
            self.publish(Some(value));
        }
    }

    async fn on_watchdog_tick(&mut self) {
        let config = self.store.get().clone();

        match self.watchdog.poll(&config).await {
            Some(WatchdogDecision::Start) => {
                info!("인원 기준 도달, 핑 사이클 자동 시작");
                self.mutate(|c| c.is_running = true);
                let config = self.store.get().clone();
                let confirmed = self.cycle.start(&config).await;
                self.publish(confirmed);
            }
            Some(WatchdogDecision::Stop) => {
                info!("인원 기준 미달, 핑 사이클 자동 중지");
                self.mutate(|c| c.is_running = false);
                self.cycle.stop();
                let confirmed = self.restore_default().await;
                self.publish(confirmed);
            }
            Some(WatchdogDecision::Hold) | None => {}
        }
    }

    // ============================================================
    // 내부 헬퍼
    // ============================================================

    /// 레코드 변경 + 저장. 저장 실패는 로그만 남기고 메모리 변경은 유지한다.
    fn mutate(&mut self, updater: impl FnOnce(&mut ControlConfig)) {
        if let Err(e) = self.store.update_with(updater) {
            warn!("제어 레코드 저장 실패, 다음 저장까지 메모리가 앞섬: {e}");
        }
    }

    async fn restore_default(&self) -> Option<u32> {
        let default = self.store.get().default_threshold;
        match self.remote.write_threshold(default).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("평상시 임계값 {default}ms 복원 실패: {e}");
                None
            }
        }
    }

    /// 레코드를 뷰에 반영하고 게시한다. 수신자가 없어도 무시.
    fn publish(&mut self, current_threshold: Option<u32>) {
        self.view.refresh(self.store.get());
        if current_threshold.is_some() {
            self.view.current_threshold = current_threshold;
        }
        self.status_tx.send_replace(self.view.clone());
    }
}
