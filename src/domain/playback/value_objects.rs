//! Playback Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 播放会话唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaybackId(Uuid);

impl PlaybackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 本地音频句柄标识（object URL 的服务端对应物）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioHandleId(Uuid);

impl AudioHandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AudioHandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AudioHandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 音频来源
///
/// - Remote: 响应中直接给出的可播放地址，不归会话所有
/// - Local: 拉取二进制后在本地物化的句柄，由会话独占，必须释放
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioSource {
    #[default]
    None,
    Remote { url: String },
    Local { handle: AudioHandleId },
}

impl AudioSource {
    pub fn is_none(&self) -> bool {
        matches!(self, AudioSource::None)
    }

    /// 会话独占的本地句柄
    pub fn owned_handle(&self) -> Option<AudioHandleId> {
        match self {
            AudioSource::Local { handle } => Some(*handle),
            _ => None,
        }
    }
}

/// 格式化秒数为 `m:ss`
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
