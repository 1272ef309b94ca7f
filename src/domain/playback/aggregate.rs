//! Playback Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AudioHandleId, AudioSource, PlaybackError, PlaybackId};
use crate::domain::split_into_segments;

/// PlaybackSession 聚合根
///
/// 不变量:
/// - segments 创建后不可变
/// - 本地音频句柄只释放一次；释放后所有控制操作均无效
/// - 没有音频时 play/pause 为空操作，高亮恒为 None
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSession {
    id: PlaybackId,
    segments: Vec<String>,
    source: AudioSource,
    position_seconds: f64,
    duration_seconds: Option<f64>,
    is_playing: bool,
    released: bool,
    /// 响应元数据中的标称时长（仅用于展示）
    nominal_duration_sec: Option<f64>,
    created_at: DateTime<Utc>,
}

impl PlaybackSession {
    /// 基于生成文本创建会话（音频稍后挂载）
    pub fn new(text: &str, nominal_duration_sec: Option<f64>) -> Self {
        Self {
            id: PlaybackId::new(),
            segments: split_into_segments(text),
            source: AudioSource::None,
            position_seconds: 0.0,
            duration_seconds: None,
            is_playing: false,
            released: false,
            nominal_duration_sec,
            created_at: Utc::now(),
        }
    }

    // Getters
    pub fn id(&self) -> PlaybackId {
        self.id
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn nominal_duration_sec(&self) -> Option<f64> {
        self.nominal_duration_sec
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_audio(&self) -> bool {
        !self.released && !self.source.is_none()
    }

    /// 挂载音频来源；已释放的会话拒绝挂载，调用方需自行回收句柄
    pub fn attach_audio(
        &mut self,
        source: AudioSource,
        duration_seconds: Option<f64>,
    ) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::Released);
        }
        self.source = source;
        self.duration_seconds = duration_seconds.filter(|d| d.is_finite() && *d >= 0.0);
        self.position_seconds = 0.0;
        self.is_playing = false;
        Ok(())
    }

    /// 开始播放；返回状态是否发生变化
    pub fn play(&mut self) -> bool {
        if !self.has_audio() || self.is_playing {
            return false;
        }
        self.is_playing = true;
        true
    }

    /// 暂停播放；返回状态是否发生变化
    pub fn pause(&mut self) -> bool {
        if !self.has_audio() || !self.is_playing {
            return false;
        }
        self.is_playing = false;
        true
    }

    /// 播放器上报的解码后时长
    pub fn on_loaded_metadata(&mut self, duration_seconds: f64) -> Result<(), PlaybackError> {
        self.ensure_active()?;
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(PlaybackError::InvalidDuration(duration_seconds));
        }
        self.duration_seconds = Some(duration_seconds);
        Ok(())
    }

    /// 播放进度更新，返回新的高亮片段
    pub fn on_time_update(&mut self, position_seconds: f64) -> Result<Option<usize>, PlaybackError> {
        self.ensure_active()?;
        if !position_seconds.is_finite() || position_seconds < 0.0 {
            return Err(PlaybackError::InvalidPosition(position_seconds));
        }
        self.position_seconds = position_seconds;
        Ok(self.active_segment_index())
    }

    /// 按时长比例跳转，返回目标秒数
    pub fn seek(&mut self, fraction: f64) -> Result<f64, PlaybackError> {
        self.ensure_active()?;
        if !fraction.is_finite() {
            return Err(PlaybackError::InvalidPosition(fraction));
        }
        let duration = self
            .duration_seconds
            .ok_or(PlaybackError::DurationUnknown)?;
        self.position_seconds = (fraction * duration).clamp(0.0, duration);
        Ok(self.position_seconds)
    }

    /// 播放结束：回到开头并清除高亮
    pub fn on_ended(&mut self) {
        self.is_playing = false;
        self.position_seconds = 0.0;
    }

    /// 释放会话
    ///
    /// 幂等：只有第一次调用返回需要回收的本地句柄，远程地址不归会话所有
    pub fn release(&mut self) -> Option<AudioHandleId> {
        if self.released {
            return None;
        }
        self.released = true;
        self.is_playing = false;
        std::mem::take(&mut self.source).owned_handle()
    }

    /// 当前高亮片段
    ///
    /// 按时长等分片段：floor(position / (duration / n))，夹到 [0, n-1]；
    /// 未播放、时长未知或为 0 时为 None
    pub fn active_segment_index(&self) -> Option<usize> {
        if !self.is_playing || self.segments.is_empty() {
            return None;
        }
        let duration = self.duration_seconds.filter(|d| *d > 0.0)?;
        let count = self.segments.len();
        let slice = duration / count as f64;
        let index = (self.position_seconds / slice).floor() as usize;
        Some(index.min(count - 1))
    }

    /// 播放进度百分比
    pub fn progress_percent(&self) -> f64 {
        match self.duration_seconds {
            Some(d) if d > 0.0 => (self.position_seconds / d * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    fn ensure_active(&self) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::Released);
        }
        if self.source.is_none() {
            return Err(PlaybackError::NoAudio);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Breathe in. Hold it! Let it go. Are you here?";

    fn session_with_local_audio(duration: Option<f64>) -> (PlaybackSession, AudioHandleId) {
        let handle = AudioHandleId::new();
        let mut session = PlaybackSession::new(TEXT, Some(180.0));
        session
            .attach_audio(AudioSource::Local { handle }, duration)
            .unwrap();
        (session, handle)
    }

    #[test]
    fn test_segments_derived_once() {
        let session = PlaybackSession::new(TEXT, None);
        assert_eq!(session.segments().len(), 4);
        assert!(!session.has_audio());
    }

    #[test]
    fn test_active_segment_follows_position() {
        let (mut session, _) = session_with_local_audio(Some(120.0));
        assert!(session.play());

        // 120s / 4 段 = 每段 30s
        assert_eq!(session.on_time_update(65.0).unwrap(), Some(2));
        assert_eq!(session.on_time_update(0.0).unwrap(), Some(0));
        // 超出时长夹到最后一段
        assert_eq!(session.on_time_update(500.0).unwrap(), Some(3));
    }

    #[test]
    fn test_no_highlight_when_paused_or_duration_unknown() {
        let (mut session, _) = session_with_local_audio(Some(120.0));
        assert_eq!(session.on_time_update(65.0).unwrap(), None);

        let (mut unknown, _) = session_with_local_audio(None);
        unknown.play();
        assert_eq!(unknown.on_time_update(65.0).unwrap(), None);

        unknown.on_loaded_metadata(0.0).unwrap();
        assert_eq!(unknown.active_segment_index(), None);
    }

    #[test]
    fn test_play_is_noop_without_audio() {
        let mut session = PlaybackSession::new(TEXT, None);
        assert!(!session.play());
        assert!(!session.is_playing());
        assert_eq!(session.on_time_update(10.0), Err(PlaybackError::NoAudio));
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let (mut session, _) = session_with_local_audio(Some(200.0));
        assert_eq!(session.seek(0.25).unwrap(), 50.0);
        assert_eq!(session.seek(1.5).unwrap(), 200.0);
        assert_eq!(session.seek(-0.2).unwrap(), 0.0);
        assert_eq!(session.progress_percent(), 0.0);

        let (mut unknown, _) = session_with_local_audio(None);
        assert_eq!(unknown.seek(0.5), Err(PlaybackError::DurationUnknown));
    }

    #[test]
    fn test_ended_resets_position() {
        let (mut session, _) = session_with_local_audio(Some(120.0));
        session.play();
        session.on_time_update(119.0).unwrap();
        session.on_ended();

        assert!(!session.is_playing());
        assert_eq!(session.position_seconds(), 0.0);
        assert_eq!(session.active_segment_index(), None);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut session, handle) = session_with_local_audio(Some(120.0));
        session.play();

        assert_eq!(session.release(), Some(handle));
        assert_eq!(session.release(), None);
        assert!(!session.is_playing());
        assert!(!session.play());
        assert_eq!(
            session.attach_audio(AudioSource::Local { handle: AudioHandleId::new() }, None),
            Err(PlaybackError::Released)
        );
    }

    #[test]
    fn test_remote_source_never_released_as_owned() {
        let mut session = PlaybackSession::new(TEXT, None);
        session
            .attach_audio(
                AudioSource::Remote {
                    url: "https://cdn.example.com/meditation.mp3".into(),
                },
                None,
            )
            .unwrap();
        assert!(session.play());
        assert_eq!(session.release(), None);
        assert!(session.is_released());
    }
}
