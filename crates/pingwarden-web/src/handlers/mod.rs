//! API 핸들러 모듈.

pub mod commands;
pub mod interactions;
