//! 원격 제어 API 포트.
//!
//! 구현: `pingwarden-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::occupancy::Occupancy;

/// 게임 서버 원격 제어 클라이언트
///
/// 각 호출은 네트워크 요청 1회. 재시도는 호출자 책임.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// 현재 최대 핑 임계값 조회 (ms)
    async fn read_threshold(&self) -> Result<u32, CoreError>;

    /// 최대 핑 임계값 변경, 서버가 확인한 값 반환 (ms)
    async fn write_threshold(&self, max_ms: u32) -> Result<u32, CoreError>;

    /// 양 진영 접속 인원 조회
    async fn read_occupancy(&self) -> Result<Occupancy, CoreError>;
}
