//! API 라우트 정의.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 상태
        .route("/status", get(handlers::commands::get_status))
        // 사이클 제어
        .route("/commands/start", post(handlers::commands::post_start))
        .route("/commands/stop", post(handlers::commands::post_stop))
        .route("/commands/auto", post(handlers::commands::post_toggle_auto))
        // 숫자 설정 (본문: {"value": "..."})
        .route("/commands/interval", post(handlers::commands::post_interval))
        .route("/commands/duration", post(handlers::commands::post_duration))
        .route("/commands/target", post(handlers::commands::post_target))
        .route(
            "/commands/default-threshold",
            post(handlers::commands::post_default_threshold),
        )
}
