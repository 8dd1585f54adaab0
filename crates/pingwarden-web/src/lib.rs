//! # pingwarden-web
//!
//! 운영자 명령 HTTP 서버.
//! Axum 기반 REST API + 채팅 플랫폼 인터랙션 웹훅.
//!
//! ## 기능
//! - 상태 조회 (`GET /api/status`)
//! - 명령 (`POST /api/commands/*`)
//! - 버튼/모달 인터랙션 (`POST /interactions`, 공개키가 설정된 경우에만)

pub mod error;
pub mod handlers;
pub mod routes;
pub mod signature;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use pingwarden_core::config::WebSettings;
use pingwarden_core::ports::command::CommandPort;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::signature::InteractionVerifier;

/// 포트 바인드 최대 시도 횟수
const MAX_PORT_ATTEMPTS: u16 = 10;

/// 서버 자신의 origin 목록
fn own_origins(port: u16) -> Vec<HeaderValue> {
    ["localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| HeaderValue::from_str(&format!("http://{host}:{port}")).ok())
        .collect()
}

/// 다른 사이트에서 온 브라우저 요청 차단.
///
/// 본문 없는 POST는 CORS 사전 요청 없이 바로 실행되므로 `Origin`을 직접 확인한다.
/// `Origin`이 없는 요청(CLI, 인터랙션 웹훅)은 통과.
async fn reject_foreign_origin(
    State(allowed): State<Arc<Vec<HeaderValue>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !allowed.contains(origin) {
            warn!("허용되지 않은 origin 요청 거부: {origin:?}");
            return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
        }
    }
    next.run(request).await
}

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 명령 포트 (에이전트 핸들)
    pub commands: Arc<dyn CommandPort>,
    /// 인터랙션 서명 검증기 (없으면 웹훅 비활성화)
    pub verifier: Option<Arc<InteractionVerifier>>,
}

/// 운영자 명령 서버
pub struct WebServer {
    config: WebSettings,
    state: AppState,
}

impl WebServer {
    /// 새 웹 서버 생성
    pub fn new(commands: Arc<dyn CommandPort>, config: WebSettings) -> Self {
        Self {
            config,
            state: AppState {
                commands,
                verifier: None,
            },
        }
    }

    /// 인터랙션 서명 검증기 설정
    pub fn with_verifier(mut self, verifier: InteractionVerifier) -> Self {
        self.state.verifier = Some(Arc::new(verifier));
        self
    }

    /// 라우터 구성
    ///
    /// 브라우저 요청은 이 서버 자신의 origin(`port`)에서 온 것만 받는다.
    pub fn router(state: AppState, port: u16) -> Router {
        let origins = own_origins(port);
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins.clone()))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);

        let mut app = Router::new().nest("/api", routes::api_routes());

        if state.verifier.is_some() {
            app = app.route("/interactions", post(handlers::interactions::handle_interaction));
        }

        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    Arc::new(origins),
                    reject_foreign_origin,
                ))
                .layer(cors),
        )
        .with_state(state)
    }

    /// 서버 실행
    ///
    /// 기본 포트가 사용 중이면 다음 포트를 시도한다 (최대 10개).
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let host = if self.config.allow_external {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let interactions = self.state.verifier.is_some();

        let base_port = self.config.port;
        let mut last_error = None;

        for attempt in 0..MAX_PORT_ATTEMPTS {
            let port = base_port.saturating_add(attempt);

            // u16 끝에 도달하면 같은 포트를 반복하게 된다
            if attempt > 0 && port == base_port.saturating_add(attempt - 1) {
                break;
            }

            let addr: SocketAddr = match format!("{host}:{port}").parse() {
                Ok(a) => a,
                Err(e) => {
                    error!("잘못된 주소 {host}:{port}: {e}");
                    continue;
                }
            };

            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let bound_port = listener.local_addr()?.port();
                    let app = Self::router(self.state.clone(), bound_port);
                    if attempt > 0 {
                        warn!("포트 {base_port} 사용 불가, 대체 포트 {port} 사용");
                    }
                    info!(
                        "명령 서버 시작: http://{addr} (인터랙션 웹훅: {})",
                        if interactions { "켜짐" } else { "꺼짐" }
                    );

                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            loop {
                                if *shutdown_rx.borrow() {
                                    info!("명령 서버 종료 신호 수신");
                                    break;
                                }
                                if shutdown_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        })
                        .await?;

                    info!("명령 서버 종료");
                    return Ok(());
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::AddrInUse {
                        warn!("포트 {port} 이미 사용 중, 다음 포트 시도...");
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!(
                    "포트 {}-{} 모두 사용 불가",
                    base_port,
                    base_port.saturating_add(MAX_PORT_ATTEMPTS - 1)
                ),
            )
        }))
    }

    /// 서버 URL
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pingwarden_core::config::ControlConfig;
    use pingwarden_core::error::CoreError;
    use pingwarden_core::models::command::{parse_positive, OperatorCommand};
    use pingwarden_core::models::status::StatusView;
    use pingwarden_core::ports::command::CommandPort;

    /// 받은 명령을 기록하고 간단히 적용하는 명령 포트
    pub struct FakeCommands {
        view: Mutex<StatusView>,
        received: Mutex<Vec<OperatorCommand>>,
    }

    impl FakeCommands {
        pub fn new() -> Self {
            Self {
                view: Mutex::new(StatusView::new(ControlConfig::default())),
                received: Mutex::new(Vec::new()),
            }
        }

        pub fn received(&self) -> Vec<OperatorCommand> {
            self.received.lock().clone()
        }
    }

    #[async_trait]
    impl CommandPort for FakeCommands {
        async fn submit(&self, command: OperatorCommand) -> Result<StatusView, CoreError> {
            self.received.lock().push(command.clone());

            let mut config = self.view.lock().config.clone();
            match &command {
                OperatorCommand::Start => config.is_running = true,
                OperatorCommand::Stop => config.is_running = false,
                OperatorCommand::ToggleAuto => config.auto_mode = !config.auto_mode,
                OperatorCommand::SetInterval(raw) => {
                    config.interval_minutes = parse_positive("intervalMinutes", raw)?
                }
                OperatorCommand::SetDuration(raw) => {
                    config.duration_seconds = parse_positive("durationSeconds", raw)?
                }
                OperatorCommand::SetTarget(raw) => {
                    config.target_threshold = parse_positive("targetThreshold", raw)?
                }
                OperatorCommand::SetDefaultThreshold(raw) => {
                    config.default_threshold = parse_positive("defaultThreshold", raw)?
                }
            }

            let mut view = self.view.lock();
            view.refresh(&config);
            Ok(view.clone())
        }

        fn status(&self) -> StatusView {
            self.view.lock().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn web_server_url() {
        let commands = Arc::new(test_support::FakeCommands::new());
        let server = WebServer::new(commands, WebSettings::default());
        assert_eq!(server.url(), "http://localhost:9191");
    }

    #[test]
    fn router_builds_with_and_without_verifier() {
        let commands: Arc<dyn CommandPort> = Arc::new(test_support::FakeCommands::new());
        let _ = WebServer::router(
            AppState {
                commands: commands.clone(),
                verifier: None,
            },
            9191,
        );

        let key = crate::signature::tests::signing_key().verifying_key();
        let _ = WebServer::router(
            AppState {
                commands,
                verifier: Some(Arc::new(InteractionVerifier::from_key(key))),
            },
            9191,
        );
    }

    fn command_router() -> (Router, Arc<test_support::FakeCommands>) {
        let commands = Arc::new(test_support::FakeCommands::new());
        let state = AppState {
            commands: commands.clone(),
            verifier: None,
        };
        (WebServer::router(state, 9191), commands)
    }

    fn post_start(origin: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/commands/start");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn foreign_origin_is_rejected() {
        let (app, commands) = command_router();

        let response = app
            .oneshot(post_start(Some("http://evil.example")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        assert!(commands.received().is_empty());
    }

    #[tokio::test]
    async fn own_origin_and_no_origin_are_accepted() {
        let (app, commands) = command_router();

        let response = app
            .clone()
            .oneshot(post_start(Some("http://localhost:9191")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:9191"))
        );

        let response = app.oneshot(post_start(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(commands.received().len(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let commands = Arc::new(test_support::FakeCommands::new());
        let settings = WebSettings {
            port: 0,
            ..WebSettings::default()
        };
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(WebServer::new(commands, settings).run(rx));
        tx.send(true).unwrap();

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }
}
