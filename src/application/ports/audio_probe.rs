//! Audio Probe Port - 音频时长探测

use thiserror::Error;

/// 探测错误
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Unknown duration")]
    UnknownDuration,
}

/// 音频信息
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// 时长（秒）
    pub duration_secs: f64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: Option<u8>,
}

/// Audio Probe Port
///
/// 只读取容器头信息，不解码
pub trait AudioProbePort: Send + Sync {
    fn probe(&self, data: &[u8], mime_type: Option<&str>) -> Result<AudioInfo, ProbeError>;
}
