//! # pingwarden-control
//!
//! 제어 루프. 타이머 틱, 인원 감시 결정, 운영자 명령을 하나의 직렬 큐로 모아
//! 단일 소비자([`agent::Agent`])가 차례로 처리한다.
//!
//! - [`timer`]: `TimerDriver` 포트의 tokio 구현
//! - [`ping_cycle`]: 임계값 낮춤 → 복원 사이클
//! - [`watchdog`]: 인원 폴링과 자동 시작/중지 결정
//! - [`dispatcher`]: 요청별 상태 전이 (검증 → 변경 → 저장 → 구동 → 게시)
//! - [`agent`]: 요청 큐와 명령 핸들
//! - [`renderer`]: 상태 메시지 생성/수정 루프

pub mod agent;
pub mod dispatcher;
pub mod ping_cycle;
pub mod renderer;
pub mod timer;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod test_support;
