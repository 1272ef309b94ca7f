//! Audio Store Port - 本地音频句柄
//!
//! 把拉取到的二进制音频物化为可播放的本地句柄（浏览器 object URL 的对应物），
//! 句柄必须显式回收

use std::sync::Arc;

use thiserror::Error;

use crate::domain::playback::AudioHandleId;

/// 音频存储错误
#[derive(Debug, Error)]
pub enum AudioStoreError {
    #[error("Audio handle not found: {0}")]
    NotFound(AudioHandleId),

    #[error("Audio data is empty")]
    Empty,

    #[error("Audio too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// 已物化的音频
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub handle: AudioHandleId,
    pub data: Arc<Vec<u8>>,
    pub mime_type: String,
}

/// Audio Store Port
pub trait AudioStorePort: Send + Sync {
    /// 物化音频数据，返回新句柄
    fn materialize(&self, data: Vec<u8>, mime_type: &str) -> Result<AudioHandleId, AudioStoreError>;

    /// 读取句柄对应的音频
    fn open(&self, handle: &AudioHandleId) -> Result<StoredAudio, AudioStoreError>;

    /// 回收句柄；句柄不存在时返回 false
    fn revoke(&self, handle: &AudioHandleId) -> bool;

    /// 当前持有的句柄数
    fn count(&self) -> usize;
}
