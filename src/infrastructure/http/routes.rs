//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                      GET   健康检查
//! - /api/flow/catalog              GET   步骤目录
//! - /api/flow/start                POST  开始新表单
//! - /api/flow/get                  POST  获取表单视图
//! - /api/flow/answer               POST  记录回答（单选 / 文本 / 勾选可能触发自动前进）
//! - /api/flow/toggle               POST  多选切换
//! - /api/flow/next                 POST  前进
//! - /api/flow/previous             POST  后退
//! - /api/flow/skip                 POST  跳过可跳过的步骤
//! - /api/flow/reset                POST  清空回答（Create Another）
//! - /api/flow/submit               POST  提交到生成工作流
//! - /api/flow/close                POST  关闭表单并释放播放
//! - /api/playback/get              POST  获取播放视图
//! - /api/playback/play|pause|ended POST  播放器状态上报
//! - /api/playback/time_update      POST  播放位置上报
//! - /api/playback/loaded_metadata  POST  时长上报
//! - /api/playback/seek             POST  按进度比例跳转
//! - /api/playback/release          POST  释放播放会话（幂等）
//! - /api/audio/{handle}            GET   本地音频字节
//! - /ws/flow/{flow_id}             WS    表单事件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/flow/:flow_id", get(handlers::flow_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/flow", flow_routes())
        .nest("/playback", playback_routes())
        .route("/audio/:handle", get(handlers::get_audio))
}

/// Flow 路由
fn flow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog", get(handlers::get_catalog))
        .route("/start", post(handlers::start_flow))
        .route("/get", post(handlers::get_flow))
        .route("/answer", post(handlers::answer))
        .route("/toggle", post(handlers::toggle))
        .route("/next", post(handlers::next))
        .route("/previous", post(handlers::previous))
        .route("/skip", post(handlers::skip))
        .route("/reset", post(handlers::reset_flow))
        .route("/submit", post(handlers::submit_flow))
        .route("/close", post(handlers::close_flow))
}

/// Playback 路由
fn playback_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/get", post(handlers::get_playback))
        .route("/play", post(handlers::play))
        .route("/pause", post(handlers::pause))
        .route("/time_update", post(handlers::time_update))
        .route("/loaded_metadata", post(handlers::loaded_metadata))
        .route("/seek", post(handlers::seek))
        .route("/ended", post(handlers::ended))
        .route("/release", post(handlers::release))
}
