//! 인원 감시기.
//!
//! 사이클 간격과 무관한 고정 주기로 인원을 폴링하고,
//! 자동 모드일 때만 핑 사이클의 시작/중지를 결정한다.
//! 결정을 적용(저장, 사이클 구동, 복원 쓰기)하는 것은 디스패처 몫이다.

use pingwarden_core::config::{ControlConfig, WatchdogSettings};
use pingwarden_core::ports::remote_control::RemoteControl;
use pingwarden_core::ports::timer::{TimerDriver, TimerHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::AgentRequest;

/// 감시 틱 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogDecision {
    /// 기준 이상 + 정지 상태 → 시작
    Start,
    /// 기준 미만 + 실행 상태 → 중지
    Stop,
    /// 변화 없음
    Hold,
}

/// 단일 기준, 히스테리시스 없음
pub fn decide(total: u32, threshold: u32, is_running: bool) -> WatchdogDecision {
    match (total >= threshold, is_running) {
        (true, false) => WatchdogDecision::Start,
        (false, true) => WatchdogDecision::Stop,
        _ => WatchdogDecision::Hold,
    }
}

/// 인원 감시기
pub struct OccupancyWatchdog {
    timers: Arc<dyn TimerDriver>,
    remote: Arc<dyn RemoteControl>,
    requests: mpsc::UnboundedSender<AgentRequest>,
    period: Duration,
    occupancy_threshold: u32,
    handle: Option<TimerHandle>,
}

impl OccupancyWatchdog {
    pub fn new(
        settings: &WatchdogSettings,
        timers: Arc<dyn TimerDriver>,
        remote: Arc<dyn RemoteControl>,
        requests: mpsc::UnboundedSender<AgentRequest>,
    ) -> Self {
        Self {
            timers,
            remote,
            requests,
            period: Duration::from_secs(settings.poll_interval_secs),
            occupancy_threshold: settings.occupancy_threshold,
            handle: None,
        }
    }

    /// 폴링 타이머 예약 (기존 타이머는 먼저 취소)
    pub fn arm(&mut self) {
        self.disarm();

        let tx = self.requests.clone();
        let handle = self.timers.repeat(
            self.period,
            Arc::new(move || {
                let _ = tx.send(AgentRequest::WatchdogTick);
            }),
        );

        info!(
            "인원 감시 시작: {}초 주기, 기준 {}명",
            self.period.as_secs(),
            self.occupancy_threshold
        );
        self.handle = Some(handle);
    }

    /// 폴링 타이머 취소
    pub fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
            debug!("인원 감시 타이머 취소");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// 감시 틱 1회.
    ///
    /// 자동 모드가 꺼져 있거나 인원 조회가 실패하면 None (상태 변경 없음).
    pub async fn poll(&self, config: &ControlConfig) -> Option<WatchdogDecision> {
        if !config.auto_mode {
            return None;
        }

        let occupancy = match self.remote.read_occupancy().await {
            Ok(occupancy) => occupancy,
            Err(e) => {
                warn!("인원 조회 실패, 이번 틱 건너뜀: {e}");
                return None;
            }
        };

        let total = occupancy.total();
        let decision = decide(total, self.occupancy_threshold, config.is_running);
        debug!(
            "인원 {total}명 (기준 {}), 실행 중={} → {decision:?}",
            self.occupancy_threshold, config.is_running
        );
        Some(decision)
    }
}
