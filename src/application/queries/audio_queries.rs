//! Audio Queries - 音频查询

/// 获取本地音频句柄的数据
#[derive(Debug, Clone)]
pub struct GetAudioQuery {
    pub handle: String,
}

/// 获取音频响应
#[derive(Debug, Clone)]
pub struct GetAudioResponse {
    pub audio_data: std::sync::Arc<Vec<u8>>,
    pub content_type: String,
}
