//! # pingwarden-app
//!
//! PINGWARDEN 에이전트 바이너리 진입점.
//! 어댑터 조립(DI), 에이전트/렌더러/명령 서버 태스크 기동, 시그널 종료.

use anyhow::{Context, Result};
use clap::Parser;
use pingwarden_control::agent::Agent;
use pingwarden_control::renderer::StatusRenderer;
use pingwarden_control::timer::TokioTimers;
use pingwarden_core::config::AgentSettings;
use pingwarden_core::config_store::ConfigStore;
use pingwarden_core::ports::presenter::StatusPresenter;
use pingwarden_network::discord::DiscordStatusBoard;
use pingwarden_network::http_client::RemoteControlClient;
use pingwarden_web::signature::InteractionVerifier;
use pingwarden_web::WebServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// PINGWARDEN 에이전트
///
/// 최대 핑 자동 추방 임계값을 주기적으로 낮췄다가 복원한다.
#[derive(Parser, Debug)]
#[command(name = "pingwarden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 시작 설정 파일 (TOML/JSON/YAML). 없으면 환경변수(PINGWARDEN__*)만 사용
    #[arg(long, short = 'c')]
    settings: Option<PathBuf>,

    /// 제어 레코드 파일 경로 (기본: 플랫폼 데이터 디렉토리의 control.json)
    #[arg(long)]
    control_file: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 명령 서버 비활성화
    #[arg(long)]
    no_web: bool,
}

/// 제어 레코드 경로 결정 (CLI 인자 > 시작 설정 > 플랫폼 기본 경로)
fn resolve_control_path(cli: Option<PathBuf>, settings: &AgentSettings) -> PathBuf {
    cli.or_else(|| settings.control_file.clone())
        .unwrap_or_else(ConfigStore::default_path)
}

/// SIGINT/SIGTERM (Windows는 Ctrl+C) 대기. 받은 시그널 이름을 돌려준다.
async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        return Ok(name);
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "pingwarden={level},pingwarden_app={level},pingwarden_core={level},pingwarden_network={level},pingwarden_control={level},pingwarden_web={level}",
        level = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    // 필수 설정 누락은 여기서 치명적 에러로 종료
    let settings = AgentSettings::load(args.settings.as_deref()).context("시작 설정 오류")?;

    let control_path = resolve_control_path(args.control_file.clone(), &settings);
    let store = ConfigStore::open(control_path).context("제어 레코드 저장소 열기 실패")?;
    info!(
        "제어 레코드: {} (running={}, auto={})",
        store.path().display(),
        store.get().is_running,
        store.get().auto_mode
    );

    // 어댑터
    let remote = Arc::new(
        RemoteControlClient::new(
            &settings.remote.base_url,
            &settings.remote.api_token,
            settings.request_timeout(),
        )
        .context("원격 제어 클라이언트 생성 실패")?,
    );

    let board = DiscordStatusBoard::new(&settings.discord, settings.request_timeout())
        .context("표시 계층 클라이언트 생성 실패")?;
    board.connect().await.context("표시 계층 로그인 실패")?;
    let presenter: Arc<dyn StatusPresenter> = Arc::new(board);

    let verifier = match settings.discord.public_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            Some(InteractionVerifier::from_hex(key).context("인터랙션 공개키 오류")?)
        }
        _ => {
            warn!("discord.public_key 미설정: 버튼 인터랙션 비활성화");
            None
        }
    };

    // 명령 서버 종료 신호. 에이전트는 큐의 Shutdown 요청으로 따로 멈춘다.
    let (web_shutdown_tx, web_shutdown_rx) = watch::channel(false);

    // 에이전트 (직렬 큐 소비자)
    let (agent, handle) = Agent::new(
        store,
        remote,
        Arc::new(TokioTimers::new()),
        &settings.watchdog,
    );
    let agent_task = tokio::spawn(agent.run());

    // 상태 렌더러: 에이전트가 끝나 게시자가 사라지면 종료
    let renderer_task = tokio::spawn(StatusRenderer::new(presenter).run(handle.subscribe()));

    // 명령 서버
    let web_task = if settings.web.enabled && !args.no_web {
        let mut server = WebServer::new(Arc::new(handle.clone()), settings.web.clone());
        if let Some(verifier) = verifier {
            server = server.with_verifier(verifier);
        }
        info!("명령 서버: {}", server.url());

        Some(tokio::spawn(async move {
            if let Err(e) = server.run(web_shutdown_rx).await {
                error!("명령 서버 오류: {e}");
            }
        }))
    } else {
        info!("명령 서버 비활성화");
        None
    };

    info!("PINGWARDEN 에이전트 실행 중 (Ctrl+C로 종료)");

    match shutdown_signal().await {
        Ok(name) => info!("{name} 수신, 종료 시작"),
        Err(e) => error!("시그널 핸들러 등록 실패, 즉시 종료: {e}"),
    }
    web_shutdown_tx.send_replace(true);

    // 종료 순서: 명령 차단 → 에이전트 정리(예약 복원) → 렌더러 마지막 반영
    if let Some(task) = web_task {
        if let Err(e) = task.await {
            warn!("명령 서버 태스크 조인 실패: {e}");
        }
    }

    handle.shutdown();
    drop(handle);

    if let Err(e) = agent_task.await {
        warn!("에이전트 태스크 조인 실패: {e}");
    }
    if let Err(e) = renderer_task.await {
        warn!("렌더러 태스크 조인 실패: {e}");
    }

    info!("PINGWARDEN 에이전트 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::parse_from(["pingwarden"]);
        assert_eq!(args.log_level, "info");
        assert!(args.settings.is_none());
        assert!(!args.no_web);
    }

    #[test]
    fn control_path_precedence() {
        let mut settings = AgentSettings::default();
        settings.control_file = Some(PathBuf::from("/srv/from-settings.json"));

        let cli = Some(PathBuf::from("/srv/from-cli.json"));
        assert_eq!(
            resolve_control_path(cli, &settings),
            PathBuf::from("/srv/from-cli.json")
        );
        assert_eq!(
            resolve_control_path(None, &settings),
            PathBuf::from("/srv/from-settings.json")
        );

        settings.control_file = None;
        assert_eq!(
            resolve_control_path(None, &settings),
            ConfigStore::default_path()
        );
    }
}
