//! Playback Handlers
//!
//! 前端播放器把 play / pause / timeupdate / loadedmetadata / ended 上报到这里

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::{
    GetPlaybackQuery, PlaybackAction, PlaybackControlCommand, PlaybackView,
    ReleasePlaybackCommand, ReleasePlaybackResponse,
};
use crate::infrastructure::http::dto::{ApiResponse, PlaybackIdRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

type PlaybackResult = Result<Json<ApiResponse<PlaybackView>>, ApiError>;

async fn control(state: &AppState, playback_id: String, action: PlaybackAction) -> PlaybackResult {
    let view = state
        .playback_control_handler
        .handle(PlaybackControlCommand {
            playback_id,
            action,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_playback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaybackIdRequest>,
) -> PlaybackResult {
    let view = state
        .get_playback_handler
        .handle(GetPlaybackQuery {
            playback_id: req.playback_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn play(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaybackIdRequest>,
) -> PlaybackResult {
    control(&state, req.playback_id, PlaybackAction::Play).await
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaybackIdRequest>,
) -> PlaybackResult {
    control(&state, req.playback_id, PlaybackAction::Pause).await
}

pub async fn ended(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaybackIdRequest>,
) -> PlaybackResult {
    control(&state, req.playback_id, PlaybackAction::Ended).await
}

#[derive(Debug, Deserialize)]
pub struct TimeUpdateRequest {
    pub playback_id: String,
    pub position_seconds: f64,
}

pub async fn time_update(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimeUpdateRequest>,
) -> PlaybackResult {
    let action = PlaybackAction::TimeUpdate {
        position_seconds: req.position_seconds,
    };
    control(&state, req.playback_id, action).await
}

#[derive(Debug, Deserialize)]
pub struct LoadedMetadataRequest {
    pub playback_id: String,
    pub duration_seconds: f64,
}

pub async fn loaded_metadata(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadedMetadataRequest>,
) -> PlaybackResult {
    let action = PlaybackAction::LoadedMetadata {
        duration_seconds: req.duration_seconds,
    };
    control(&state, req.playback_id, action).await
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub playback_id: String,
    /// 进度条点击位置，0.0 ~ 1.0
    pub fraction: f64,
}

pub async fn seek(State(state): State<Arc<AppState>>, Json(req): Json<SeekRequest>) -> PlaybackResult {
    let action = PlaybackAction::Seek {
        fraction: req.fraction,
    };
    control(&state, req.playback_id, action).await
}

pub async fn release(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaybackIdRequest>,
) -> Result<Json<ApiResponse<ReleasePlaybackResponse>>, ApiError> {
    let result = state
        .release_playback_handler
        .handle(ReleasePlaybackCommand {
            playback_id: req.playback_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
