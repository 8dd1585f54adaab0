//! 타이머 포트.
//!
//! 구현: `pingwarden-control` crate (tokio 태스크).
//! 테스트에서는 계측용 드라이버로 교체해 예약/취소를 검증한다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// 반복 타이머 콜백
pub type RepeatCallback = Arc<dyn Fn() + Send + Sync>;

/// 1회성 타이머 콜백
pub type OnceCallback = Box<dyn FnOnce() + Send>;

/// 예약된 타이머 핸들
///
/// `cancel()` 또는 drop 시 타이머가 취소된다.
pub struct TimerHandle {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    pub fn new(id: u64, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// 드라이버가 부여한 식별자
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 타이머 취소
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").field("id", &self.id).finish()
    }
}

/// 타이머 드라이버
pub trait TimerDriver: Send + Sync {
    /// `period`마다 `fire` 호출 (첫 호출은 한 주기 뒤)
    fn repeat(&self, period: Duration, fire: RepeatCallback) -> TimerHandle;

    /// `delay` 뒤 `fire` 1회 호출
    fn once(&self, delay: Duration, fire: OnceCallback) -> TimerHandle;
}
