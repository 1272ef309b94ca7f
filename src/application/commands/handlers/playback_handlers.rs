//! Playback Command Handlers

use std::sync::Arc;

use crate::application::commands::playback_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    modify_session, AudioStorePort, FlowSession, PlaybackEntry, SessionStorePort,
};
use crate::infrastructure::events::EventPublisher;

/// PlaybackControl Handler - 播放器上报与控制
pub struct PlaybackControlHandler {
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    event_publisher: Arc<EventPublisher>,
}

impl PlaybackControlHandler {
    pub fn new(
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            playback_store,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: PlaybackControlCommand) -> Result<PlaybackView, ApplicationError> {
        let action = cmd.action;
        let (view, seek_to) = modify_session(self.playback_store.as_ref(), &cmd.playback_id, |entry| {
            let session = &mut entry.session;
            let mut seek_to = None;
            match action {
                PlaybackAction::Play => {
                    session.play();
                }
                PlaybackAction::Pause => {
                    session.pause();
                }
                PlaybackAction::TimeUpdate { position_seconds } => {
                    session.on_time_update(position_seconds)?;
                }
                PlaybackAction::LoadedMetadata { duration_seconds } => {
                    session.on_loaded_metadata(duration_seconds)?;
                }
                PlaybackAction::Seek { fraction } => {
                    seek_to = Some(session.seek(fraction)?);
                }
                PlaybackAction::Ended => session.on_ended(),
            }
            Ok::<_, ApplicationError>((PlaybackView::from_entry(entry), seek_to))
        })
        .map_err(|e| ApplicationError::from_session("Playback", e))??;

        if let Some(position_seconds) = seek_to {
            self.event_publisher
                .publish_seek_requested(&view.flow_id, &view.playback_id, position_seconds);
        }
        self.event_publisher.publish_playback_progress(
            &view.flow_id,
            &view.playback_id,
            view.position_seconds,
            view.active_segment,
            view.is_playing,
        );

        tracing::debug!(
            playback_id = %view.playback_id,
            action = action.as_str(),
            position_seconds = view.position_seconds,
            active_segment = ?view.active_segment,
            "Playback updated"
        );

        Ok(view)
    }
}

/// ReleasePlayback Handler - 释放播放会话及其本地音频句柄
///
/// 幂等：会话不存在或已释放时直接返回
pub struct ReleasePlaybackHandler {
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    audio_store: Arc<dyn AudioStorePort>,
    event_publisher: Arc<EventPublisher>,
}

impl ReleasePlaybackHandler {
    pub fn new(
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        audio_store: Arc<dyn AudioStorePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            playback_store,
            flow_store,
            audio_store,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReleasePlaybackCommand,
    ) -> Result<ReleasePlaybackResponse, ApplicationError> {
        let released = self.release(&cmd.playback_id);
        Ok(ReleasePlaybackResponse {
            playback_id: cmd.playback_id,
            released,
        })
    }

    /// 释放播放会话，返回本次调用是否真正执行了释放
    pub fn release(&self, playback_id: &str) -> bool {
        let Some(mut entry) = self.playback_store.remove(playback_id) else {
            return false;
        };

        if let Some(handle) = entry.session.release() {
            if !self.audio_store.revoke(&handle) {
                tracing::warn!(
                    playback_id = %playback_id,
                    handle = %handle,
                    "Audio handle was already revoked"
                );
            }
        }

        // 表单可能已关闭，忽略 NotFound
        let _ = self.flow_store.update(&entry.flow_id, &mut |flow: &mut FlowSession| {
            if flow.playback_id.map(|id| id.to_string()).as_deref() == Some(playback_id) {
                flow.playback_id = None;
            }
        });

        self.event_publisher
            .publish_playback_released(&entry.flow_id, playback_id);
        tracing::info!(
            playback_id = %playback_id,
            flow_id = %entry.flow_id,
            "Playback released"
        );
        true
    }
}
