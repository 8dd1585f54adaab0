//! 핑 사이클 컨트롤러.
//!
//! 사이클 1회 = 낮춤(`target_threshold` 적용) → `duration_seconds` 뒤 복원(`default_threshold`).
//! 두 단계는 모두 에이전트 큐를 거쳐 실행되고, 타이머는 요청을 넣기만 한다.
//!
//! 상태: **Idle** (반복 타이머 없음) / **Armed** (반복 타이머 1개).
//! 복원 대기는 컨트롤러당 최대 1개이며 `stop()`과 무관하게 살아남는다.

use pingwarden_core::config::ControlConfig;
use pingwarden_core::ports::remote_control::RemoteControl;
use pingwarden_core::ports::timer::{TimerDriver, TimerHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::AgentRequest;

/// 반복 타이머와 그 예약 번호
#[derive(Debug)]
struct PeriodicTimer {
    arm: u64,
    timer: TimerHandle,
}

/// 예약된 복원
#[derive(Debug)]
struct PendingRestore {
    cycle: u64,
    timer: TimerHandle,
}

/// 핑 사이클 컨트롤러
pub struct PingCycleController {
    timers: Arc<dyn TimerDriver>,
    remote: Arc<dyn RemoteControl>,
    requests: mpsc::UnboundedSender<AgentRequest>,
    /// 반복 타이머 (Armed일 때만 Some)
    periodic: Option<PeriodicTimer>,
    pending_restore: Option<PendingRestore>,
    /// 마지막으로 발급한 반복 예약 번호
    last_arm: u64,
    /// 마지막으로 발급한 사이클 번호
    last_cycle: u64,
}

impl PingCycleController {
    pub fn new(
        timers: Arc<dyn TimerDriver>,
        remote: Arc<dyn RemoteControl>,
        requests: mpsc::UnboundedSender<AgentRequest>,
    ) -> Self {
        Self {
            timers,
            remote,
            requests,
            periodic: None,
            pending_restore: None,
            last_arm: 0,
            last_cycle: 0,
        }
    }

    /// 반복 타이머가 살아 있는지
    pub fn is_armed(&self) -> bool {
        self.periodic.is_some()
    }

    /// 지금 살아 있는 반복 타이머가 보낸 틱인지.
    ///
    /// 취소 전에 큐에 들어간 틱은 새 타이머가 예약된 뒤에도 false.
    pub fn is_current_tick(&self, arm: u64) -> bool {
        matches!(&self.periodic, Some(periodic) if periodic.arm == arm)
    }

    /// 복원이 예약돼 있는지
    pub fn has_pending_restore(&self) -> bool {
        self.pending_restore.is_some()
    }

    /// 사이클 1회를 즉시 실행하고 `interval_minutes` 주기로 반복 예약한다.
    ///
    /// 이미 Armed면 기존 타이머를 먼저 취소한다. 서버가 확인한 임계값을 돌려준다.
    pub async fn start(&mut self, config: &ControlConfig) -> Option<u32> {
        if let Some(previous) = self.periodic.take() {
            debug!("기존 반복 타이머 {} 취소 후 재예약", previous.timer.id());
            previous.timer.cancel();
        }

        let confirmed = self.lower(config).await;

        self.last_arm += 1;
        let arm = self.last_arm;
        let tx = self.requests.clone();
        let timer = self.timers.repeat(
            config.interval(),
            Arc::new(move || {
                let _ = tx.send(AgentRequest::CycleTick { arm });
            }),
        );

        info!(
            "핑 사이클 시작: {}분 간격, {}초 유지, {}ms → {}ms",
            config.interval_minutes,
            config.duration_seconds,
            config.target_threshold,
            config.default_threshold
        );
        self.periodic = Some(PeriodicTimer { arm, timer });
        confirmed
    }

    /// 반복 타이머 취소. 예약된 복원은 그대로 둔다.
    ///
    /// Idle 상태에서 호출하면 아무 일도 하지 않고 false 반환.
    pub fn stop(&mut self) -> bool {
        match self.periodic.take() {
            Some(periodic) => {
                periodic.timer.cancel();
                info!("핑 사이클 중지");
                true
            }
            None => false,
        }
    }

    /// 낮춤 단계: `target_threshold` 적용 후 복원 예약.
    ///
    /// 쓰기 실패해도 복원은 예약한다 (서버가 요청을 반쯤 반영했을 수 있음).
    pub async fn lower(&mut self, config: &ControlConfig) -> Option<u32> {
        if let Some(previous) = self.pending_restore.take() {
            debug!("사이클 {}의 복원 예약을 새 사이클로 대체", previous.cycle);
            previous.timer.cancel();
        }

        self.last_cycle += 1;
        let cycle = self.last_cycle;

        let confirmed = match self.remote.write_threshold(config.target_threshold).await {
            Ok(value) => {
                info!("사이클 {cycle}: 임계값 {value}ms 적용");
                Some(value)
            }
            Err(e) => {
                warn!("사이클 {cycle}: 임계값 낮춤 실패: {e}");
                None
            }
        };

        let tx = self.requests.clone();
        let timer = self.timers.once(
            config.hold_duration(),
            Box::new(move || {
                let _ = tx.send(AgentRequest::RestoreDue { cycle });
            }),
        );
        self.pending_restore = Some(PendingRestore { cycle, timer });

        confirmed
    }

    /// 복원 단계: 현재 `default_threshold`를 쓴다.
    ///
    /// 대체된 사이클의 복원 요청이면 무시하고 None.
    pub async fn restore_due(&mut self, cycle: u64, config: &ControlConfig) -> Option<u32> {
        match &self.pending_restore {
            Some(pending) if pending.cycle == cycle => {}
            _ => {
                debug!("사이클 {cycle}의 복원 요청은 만료됨, 무시");
                return None;
            }
        }

        self.pending_restore = None;
        self.write_default(cycle, config).await
    }

    /// 예약된 복원이 있으면 타이머를 취소하고 지금 실행한다 (종료 시).
    pub async fn flush_restore(&mut self, config: &ControlConfig) -> Option<u32> {
        let pending = self.pending_restore.take()?;
        pending.timer.cancel();
        info!("사이클 {}의 복원을 즉시 실행", pending.cycle);
        self.write_default(pending.cycle, config).await
    }

    async fn write_default(&self, cycle: u64, config: &ControlConfig) -> Option<u32> {
        match self.remote.write_threshold(config.default_threshold).await {
            Ok(value) => {
                info!("사이클 {cycle}: 임계값 {value}ms 복원");
                Some(value)
            }
            Err(e) => {
                warn!("사이클 {cycle}: 임계값 복원 실패: {e}");
                None
            }
        }
    }
}
