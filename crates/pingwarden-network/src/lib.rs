//! # pingwarden-network
//!
//! 외부 HTTP 어댑터.
//! 게임 서버 원격 제어 API(REST, Bearer 인증)와
//! 상태 메시지를 게시하는 채팅 플랫폼 REST API를 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use pingwarden_network::http_client::RemoteControlClient;
//! use pingwarden_network::discord::DiscordStatusBoard;
//! ```

pub mod discord;
pub mod http_client;
