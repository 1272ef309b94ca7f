//! Playback Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("播放会话已释放")]
    Released,

    #[error("没有可播放的音频")]
    NoAudio,

    #[error("音频时长未知")]
    DurationUnknown,

    #[error("无效的播放位置: {0}")]
    InvalidPosition(f64),

    #[error("无效的音频时长: {0}")]
    InvalidDuration(f64),
}
