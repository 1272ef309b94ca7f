//! Audio Handlers
//!
//! 本地音频句柄的字节流（浏览器 object URL 的服务端对应物），回收后返回 404

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use std::sync::Arc;

use crate::application::GetAudioQuery;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Response, ApiError> {
    let result = state
        .get_audio_handler
        .handle(GetAudioQuery { handle })
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.content_type)
        .header(header::CONTENT_LENGTH, result.audio_data.len())
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(result.audio_data.as_ref().clone()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
