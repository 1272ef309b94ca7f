//! Playback Query Handlers

use std::sync::Arc;

use crate::application::commands::PlaybackView;
use crate::application::error::ApplicationError;
use crate::application::ports::{PlaybackEntry, SessionStorePort};
use crate::application::queries::GetPlaybackQuery;

/// GetPlayback Handler - 获取播放会话视图
pub struct GetPlaybackHandler {
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
}

impl GetPlaybackHandler {
    pub fn new(playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>) -> Self {
        Self { playback_store }
    }

    pub async fn handle(&self, query: GetPlaybackQuery) -> Result<PlaybackView, ApplicationError> {
        let entry = self
            .playback_store
            .get(&query.playback_id)
            .map_err(|e| ApplicationError::from_session("Playback", e))?;
        self.playback_store.touch(&query.playback_id);
        Ok(PlaybackView::from_entry(&entry))
    }
}
