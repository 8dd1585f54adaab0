//! 테스트용 포트 구현.

use async_trait::async_trait;
use parking_lot::Mutex;
use pingwarden_core::error::CoreError;
use pingwarden_core::models::occupancy::Occupancy;
use pingwarden_core::models::status::StatusView;
use pingwarden_core::ports::presenter::{MessageHandle, StatusPresenter};
use pingwarden_core::ports::remote_control::RemoteControl;
use pingwarden_core::ports::timer::{OnceCallback, RepeatCallback, TimerDriver, TimerHandle};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

// ============================================================
// 계측 타이머
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Repeat,
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub id: u64,
    pub kind: TimerKind,
    pub period: Duration,
}

enum Callback {
    Repeat(RepeatCallback),
    Once(OnceCallback),
}

#[derive(Default)]
struct Recorder {
    next_id: u64,
    armed: Vec<ArmedTimer>,
    live: HashMap<u64, Callback>,
    cancelled: Vec<u64>,
}

/// 예약/취소를 기록하고 테스트가 손으로 발화시키는 타이머 드라이버
#[derive(Clone, Default)]
pub struct RecordingTimers {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&self, kind: TimerKind, period: Duration, callback: Callback) -> TimerHandle {
        let id = {
            let mut rec = self.inner.lock();
            rec.next_id += 1;
            let id = rec.next_id;
            rec.armed.push(ArmedTimer { id, kind, period });
            rec.live.insert(id, callback);
            id
        };

        let inner = self.inner.clone();
        TimerHandle::new(id, move || {
            let mut rec = inner.lock();
            // 이미 발화한 1회 타이머는 취소로 세지 않는다
            if rec.live.remove(&id).is_some() {
                rec.cancelled.push(id);
            }
        })
    }

    /// 지금까지 예약된 타이머 (취소 여부 무관)
    pub fn armed(&self, kind: TimerKind) -> Vec<ArmedTimer> {
        self.inner
            .lock()
            .armed
            .iter()
            .filter(|t| t.kind == kind)
            .copied()
            .collect()
    }

    /// 살아 있는 타이머 ID
    pub fn live(&self, kind: TimerKind) -> Vec<u64> {
        let rec = self.inner.lock();
        let mut ids: Vec<u64> = rec
            .live
            .iter()
            .filter(|(_, cb)| match (kind, cb) {
                (TimerKind::Repeat, Callback::Repeat(_)) => true,
                (TimerKind::Once, Callback::Once(_)) => true,
                _ => false,
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn cancelled(&self) -> Vec<u64> {
        self.inner.lock().cancelled.clone()
    }

    /// 타이머 발화. 1회 타이머는 발화 후 사라진다.
    pub fn fire(&self, id: u64) {
        let callback = {
            let mut rec = self.inner.lock();
            match rec.live.get(&id) {
                Some(Callback::Repeat(cb)) => Some(Callback::Repeat(cb.clone())),
                Some(Callback::Once(_)) => rec.live.remove(&id),
                None => None,
            }
        };

        match callback {
            Some(Callback::Repeat(cb)) => cb(),
            Some(Callback::Once(cb)) => cb(),
            None => panic!("타이머 {id}는 살아 있지 않음"),
        }
    }
}

impl TimerDriver for RecordingTimers {
    fn repeat(&self, period: Duration, fire: RepeatCallback) -> TimerHandle {
        self.arm(TimerKind::Repeat, period, Callback::Repeat(fire))
    }

    fn once(&self, delay: Duration, fire: OnceCallback) -> TimerHandle {
        self.arm(TimerKind::Once, delay, Callback::Once(fire))
    }
}

// ============================================================
// 원격 제어 가짜 구현
// ============================================================

/// 쓰기를 기록하고 인원 응답을 순서대로 돌려주는 원격 제어 서버
#[derive(Default)]
pub struct FakeRemote {
    threshold: Mutex<u32>,
    writes: Mutex<Vec<u32>>,
    occupancy: Mutex<VecDeque<Result<Occupancy, CoreError>>>,
    occupancy_reads: Mutex<usize>,
    fail_writes: Mutex<bool>,
}

impl FakeRemote {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: Mutex::new(threshold),
            ..Self::default()
        }
    }

    /// 다음 인원 조회 응답 예약 (합계를 side_a에 싣는다)
    pub fn push_occupancy(&self, total: u32) {
        self.occupancy
            .lock()
            .push_back(Ok(Occupancy::new(total, 0)));
    }

    pub fn push_occupancy_error(&self) {
        self.occupancy.lock().push_back(Err(CoreError::Remote {
            status: Some(503),
            message: "unavailable".to_string(),
        }));
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn writes(&self) -> Vec<u32> {
        self.writes.lock().clone()
    }

    pub fn threshold(&self) -> u32 {
        *self.threshold.lock()
    }

    pub fn occupancy_reads(&self) -> usize {
        *self.occupancy_reads.lock()
    }
}

#[async_trait]
impl RemoteControl for FakeRemote {
    async fn read_threshold(&self) -> Result<u32, CoreError> {
        Ok(*self.threshold.lock())
    }

    async fn write_threshold(&self, max_ms: u32) -> Result<u32, CoreError> {
        self.writes.lock().push(max_ms);
        if *self.fail_writes.lock() {
            return Err(CoreError::Remote {
                status: Some(500),
                message: "write rejected".to_string(),
            });
        }
        *self.threshold.lock() = max_ms;
        Ok(max_ms)
    }

    async fn read_occupancy(&self) -> Result<Occupancy, CoreError> {
        *self.occupancy_reads.lock() += 1;
        self.occupancy
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Occupancy::default()))
    }
}

// ============================================================
// 표시 계층 가짜 구현
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterCall {
    Create(u64),
    Update(String, u64),
}

/// 호출을 기록하는 표시 계층. `vanish()` 후 첫 update는 NotFound.
#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<PresenterCall>>,
    created: Mutex<u64>,
    vanished: Mutex<bool>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().clone()
    }

    /// 메시지가 외부에서 삭제된 상황
    pub fn vanish(&self) {
        *self.vanished.lock() = true;
    }
}

#[async_trait]
impl StatusPresenter for RecordingPresenter {
    async fn connect(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn create(&self, view: &StatusView) -> Result<MessageHandle, CoreError> {
        let mut created = self.created.lock();
        *created += 1;
        self.calls.lock().push(PresenterCall::Create(view.revision));
        Ok(MessageHandle::new(format!("msg-{}", *created)))
    }

    async fn update(&self, handle: &MessageHandle, view: &StatusView) -> Result<(), CoreError> {
        let mut vanished = self.vanished.lock();
        if *vanished {
            *vanished = false;
            return Err(CoreError::NotFound {
                resource_type: "Message".to_string(),
                id: handle.as_str().to_string(),
            });
        }
        self.calls
            .lock()
            .push(PresenterCall::Update(handle.as_str().to_string(), view.revision));
        Ok(())
    }
}
