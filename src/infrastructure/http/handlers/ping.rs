//! Ping Handler - 健康检查

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_flows: usize,
    pub active_playbacks: usize,
    pub audio_handles: usize,
}

pub async fn ping(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PingResponse>> {
    Json(ApiResponse::success(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_flows: state.flow_store.list_all().len(),
        active_playbacks: state.playback_store.list_all().len(),
        audio_handles: state.audio_store.count(),
    }))
}
