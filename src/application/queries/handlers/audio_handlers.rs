//! Audio Query Handlers

use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::AudioStorePort;
use crate::application::queries::audio_queries::{GetAudioQuery, GetAudioResponse};
use crate::domain::playback::AudioHandleId;

/// GetAudio Handler - 读取本地音频句柄
///
/// 句柄释放后返回 NotFound
pub struct GetAudioHandler {
    audio_store: Arc<dyn AudioStorePort>,
}

impl GetAudioHandler {
    pub fn new(audio_store: Arc<dyn AudioStorePort>) -> Self {
        Self { audio_store }
    }

    pub async fn handle(&self, query: GetAudioQuery) -> Result<GetAudioResponse, ApplicationError> {
        let uuid = Uuid::parse_str(&query.handle)
            .map_err(|_| ApplicationError::not_found("Audio", &query.handle))?;
        let audio = self.audio_store.open(&AudioHandleId::from_uuid(uuid))?;

        Ok(GetAudioResponse {
            audio_data: audio.data,
            content_type: audio.mime_type,
        })
    }
}
