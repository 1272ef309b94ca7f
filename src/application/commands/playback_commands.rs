//! Playback Commands - 同步播放相关命令

use serde::Serialize;

use crate::application::ports::PlaybackEntry;
use crate::domain::playback::{format_time, AudioSource};

/// 播放器上报 / 控制动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackAction {
    Play,
    Pause,
    TimeUpdate { position_seconds: f64 },
    LoadedMetadata { duration_seconds: f64 },
    Seek { fraction: f64 },
    Ended,
}

impl PlaybackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
            PlaybackAction::TimeUpdate { .. } => "time_update",
            PlaybackAction::LoadedMetadata { .. } => "loaded_metadata",
            PlaybackAction::Seek { .. } => "seek",
            PlaybackAction::Ended => "ended",
        }
    }
}

/// 播放控制命令
#[derive(Debug, Clone)]
pub struct PlaybackControlCommand {
    pub playback_id: String,
    pub action: PlaybackAction,
}

/// 释放播放会话命令
#[derive(Debug, Clone)]
pub struct ReleasePlaybackCommand {
    pub playback_id: String,
}

/// 释放播放会话响应
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlaybackResponse {
    pub playback_id: String,
    /// 本次调用是否真正执行了释放（重复调用为 false）
    pub released: bool,
}

/// 播放会话视图
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackView {
    pub playback_id: String,
    pub flow_id: String,
    pub segments: Vec<String>,
    pub active_segment: Option<usize>,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub is_playing: bool,
    pub has_audio: bool,
    pub released: bool,
    pub audio_url: Option<String>,
    pub nominal_duration_sec: Option<f64>,
    pub position_label: String,
    pub duration_label: String,
    pub progress_percent: f64,
}

impl PlaybackView {
    pub fn from_entry(entry: &PlaybackEntry) -> Self {
        let session = &entry.session;
        Self {
            playback_id: entry.id.clone(),
            flow_id: entry.flow_id.clone(),
            segments: session.segments().to_vec(),
            active_segment: session.active_segment_index(),
            position_seconds: session.position_seconds(),
            duration_seconds: session.duration_seconds(),
            is_playing: session.is_playing(),
            has_audio: session.has_audio(),
            released: session.is_released(),
            audio_url: audio_url_for(session.source()),
            nominal_duration_sec: session.nominal_duration_sec(),
            position_label: format_time(session.position_seconds()),
            duration_label: format_time(session.duration_seconds().unwrap_or(0.0)),
            progress_percent: session.progress_percent(),
        }
    }
}

/// 播放器可用的音频地址；本地句柄通过音频接口提供
pub fn audio_url_for(source: &AudioSource) -> Option<String> {
    match source {
        AudioSource::None => None,
        AudioSource::Remote { url } => Some(url.clone()),
        AudioSource::Local { handle } => Some(format!("/api/audio/{}", handle)),
    }
}
