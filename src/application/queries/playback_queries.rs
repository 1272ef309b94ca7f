//! Playback Queries - 播放查询

/// 获取播放会话视图
#[derive(Debug, Clone)]
pub struct GetPlaybackQuery {
    pub playback_id: String,
}
