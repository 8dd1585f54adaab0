//! tokio 기반 타이머 드라이버.

use pingwarden_core::ports::timer::{OnceCallback, RepeatCallback, TimerDriver, TimerHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// 타이머마다 tokio 태스크 하나. 핸들 취소 시 태스크를 abort 한다.
///
/// 현재 tokio 런타임 안에서 호출해야 한다.
#[derive(Debug, Default)]
pub struct TokioTimers {
    next_id: AtomicU64,
}

impl TokioTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl TimerDriver for TokioTimers {
    fn repeat(&self, period: Duration, fire: RepeatCallback) -> TimerHandle {
        let id = self.allocate_id();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            // 프로세스가 멈췄다 깨어나도 밀린 틱을 몰아서 쏘지 않는다
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                trace!("반복 타이머 {id} 발화");
                fire();
            }
        });

        let abort = task.abort_handle();
        TimerHandle::new(id, move || abort.abort())
    }

    fn once(&self, delay: Duration, fire: OnceCallback) -> TimerHandle {
        let id = self.allocate_id();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!("1회 타이머 {id} 발화");
            fire();
        });

        let abort = task.abort_handle();
        TimerHandle::new(id, move || abort.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn repeat_fires_after_each_period() {
        let timers = TokioTimers::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let handle = timers.repeat(
            Duration::from_secs(60),
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // 첫 발화는 한 주기 뒤
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_once() {
        let timers = TokioTimers::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let _handle = timers.once(
            Duration::from_secs(5),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_once_never_fires() {
        let timers = TokioTimers::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let handle = timers.once(
            Duration::from_secs(5),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let timers = TokioTimers::new();
        let a = timers.once(Duration::from_secs(1), Box::new(|| {}));
        let b = timers.once(Duration::from_secs(1), Box::new(|| {}));
        assert_ne!(a.id(), b.id());
    }
}
