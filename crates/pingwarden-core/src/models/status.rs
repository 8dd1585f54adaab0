//! 상태 표시 모델.
//!
//! 표시 계층에 넘기는 렌더 요청과 명령 활성화 규칙.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;

/// 명령 버튼 활성화 여부
///
/// 현재 `is_running`과 모순되는 동작만 비활성화된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affordances {
    pub start: bool,
    pub stop: bool,
    pub edit_interval: bool,
    pub edit_duration: bool,
    pub edit_target: bool,
    pub edit_default_threshold: bool,
    pub toggle_auto: bool,
}

impl Affordances {
    /// 레코드에서 활성화 규칙 계산
    pub fn for_config(config: &ControlConfig) -> Self {
        let idle = !config.is_running;
        Self {
            start: idle,
            stop: config.is_running,
            edit_interval: idle,
            edit_duration: idle,
            edit_target: idle,
            edit_default_threshold: idle,
            toggle_auto: true,
        }
    }
}

/// 렌더 요청: 현재 레코드 전체 + 버튼 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub config: ControlConfig,
    pub affordances: Affordances,
    /// 서버가 마지막으로 확인해 준 임계값 (ms)
    pub current_threshold: Option<u32>,
    /// 렌더 요청마다 1씩 증가
    pub revision: u64,
    pub updated_at: String,
}

impl StatusView {
    /// 레코드로 초기 뷰 생성
    pub fn new(config: ControlConfig) -> Self {
        Self {
            affordances: Affordances::for_config(&config),
            config,
            current_threshold: None,
            revision: 0,
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// 레코드를 반영하고 revision을 올린다
    pub fn refresh(&mut self, config: &ControlConfig) {
        self.config = config.clone();
        self.affordances = Affordances::for_config(config);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.revision = self.revision.saturating_add(1);
        self.updated_at = Utc::now().to_rfc3339();
    }
}
