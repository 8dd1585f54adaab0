//! 서버 인원 모델.

use serde::{Deserialize, Serialize};

/// 양 진영 접속 인원
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    /// A 진영 인원
    pub side_a: u32,
    /// B 진영 인원
    pub side_b: u32,
}

impl Occupancy {
    /// 생성 헬퍼
    pub fn new(side_a: u32, side_b: u32) -> Self {
        Self { side_a, side_b }
    }

    /// 전체 인원
    pub fn total(&self) -> u32 {
        self.side_a.saturating_add(self.side_b)
    }
}
