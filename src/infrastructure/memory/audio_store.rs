//! In-Memory Audio Store Implementation
//!
//! 句柄即 UUID，数据在回收前常驻内存

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{AudioStoreError, AudioStorePort, StoredAudio};
use crate::domain::playback::AudioHandleId;

/// 内存音频存储
pub struct InMemoryAudioStore {
    entries: DashMap<AudioHandleId, StoredAudio>,
    max_bytes: usize,
}

impl InMemoryAudioStore {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_bytes,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl AudioStorePort for InMemoryAudioStore {
    fn materialize(&self, data: Vec<u8>, mime_type: &str) -> Result<AudioHandleId, AudioStoreError> {
        if data.is_empty() {
            return Err(AudioStoreError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(AudioStoreError::TooLarge {
                size: data.len(),
                max: self.max_bytes,
            });
        }

        let handle = AudioHandleId::new();
        let size = data.len();
        self.entries.insert(
            handle,
            StoredAudio {
                handle,
                data: Arc::new(data),
                mime_type: mime_type.to_string(),
            },
        );
        tracing::debug!(handle = %handle, size = size, mime_type = %mime_type, "Audio materialized");
        Ok(handle)
    }

    fn open(&self, handle: &AudioHandleId) -> Result<StoredAudio, AudioStoreError> {
        self.entries
            .get(handle)
            .map(|e| e.clone())
            .ok_or(AudioStoreError::NotFound(*handle))
    }

    fn revoke(&self, handle: &AudioHandleId) -> bool {
        let removed = self.entries.remove(handle).is_some();
        if removed {
            tracing::debug!(handle = %handle, "Audio handle revoked");
        }
        removed
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_open_revoke() {
        let store = InMemoryAudioStore::new(16);
        let handle = store.materialize(vec![1, 2, 3], "audio/mpeg").unwrap();

        let audio = store.open(&handle).unwrap();
        assert_eq!(audio.data.as_slice(), &[1, 2, 3]);
        assert_eq!(audio.mime_type, "audio/mpeg");
        assert_eq!(store.count(), 1);

        assert!(store.revoke(&handle));
        assert!(!store.revoke(&handle));
        assert!(matches!(store.open(&handle), Err(AudioStoreError::NotFound(_))));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let store = InMemoryAudioStore::new(4);
        assert!(matches!(
            store.materialize(Vec::new(), "audio/mpeg"),
            Err(AudioStoreError::Empty)
        ));
        assert!(matches!(
            store.materialize(vec![0; 5], "audio/mpeg"),
            Err(AudioStoreError::TooLarge { size: 5, max: 4 })
        ));
        assert_eq!(store.count(), 0);
    }
}
