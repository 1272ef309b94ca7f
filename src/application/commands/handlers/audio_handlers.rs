//! Audio Acquisition Handler
//!
//! 提交成功后在后台获取音频：直接地址直接使用，二进制引用先拉取再物化为本地句柄。
//! 获取失败只降级为纯文本，不影响会话

use std::sync::Arc;

use crate::application::commands::playback_commands::audio_url_for;
use crate::application::ports::{
    modify_session, AudioDescriptor, AudioProbePort, AudioStorePort, PlaybackEntry,
    SessionStorePort, WorkflowPort,
};
use crate::domain::playback::{AudioHandleId, AudioSource};
use crate::infrastructure::events::EventPublisher;

const DEFAULT_MIME_TYPE: &str = "audio/mpeg";

/// 音频获取结果
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireOutcome {
    /// 已挂载到会话
    Ready {
        audio_url: String,
        duration_seconds: Option<f64>,
    },
    /// 无法获取，会话保持纯文本
    Unavailable { reason: String },
    /// 会话在获取期间已释放，晚到的句柄已回收
    Discarded,
}

/// AcquireAudio Handler
pub struct AcquireAudioHandler {
    workflow: Arc<dyn WorkflowPort>,
    audio_store: Arc<dyn AudioStorePort>,
    audio_probe: Arc<dyn AudioProbePort>,
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    event_publisher: Arc<EventPublisher>,
}

impl AcquireAudioHandler {
    pub fn new(
        workflow: Arc<dyn WorkflowPort>,
        audio_store: Arc<dyn AudioStorePort>,
        audio_probe: Arc<dyn AudioProbePort>,
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            workflow,
            audio_store,
            audio_probe,
            playback_store,
            event_publisher,
        }
    }

    pub async fn acquire(
        &self,
        flow_id: &str,
        playback_id: &str,
        descriptor: AudioDescriptor,
    ) -> AcquireOutcome {
        let outcome = match descriptor {
            AudioDescriptor::Direct { url } => {
                self.attach(playback_id, AudioSource::Remote { url }, None)
            }
            AudioDescriptor::Binary {
                binary_id,
                mime_type,
            } => self.fetch_and_attach(playback_id, &binary_id, mime_type).await,
            AudioDescriptor::None => AcquireOutcome::Unavailable {
                reason: "Response contains no audio".to_string(),
            },
        };

        match &outcome {
            AcquireOutcome::Ready {
                audio_url,
                duration_seconds,
            } => {
                tracing::info!(
                    flow_id = %flow_id,
                    playback_id = %playback_id,
                    duration_seconds = ?duration_seconds,
                    "Audio ready"
                );
                self.event_publisher
                    .publish_audio_ready(flow_id, playback_id, audio_url, *duration_seconds);
            }
            AcquireOutcome::Unavailable { reason } => {
                tracing::warn!(
                    flow_id = %flow_id,
                    playback_id = %playback_id,
                    reason = %reason,
                    "Audio unavailable, continuing with text only"
                );
                self.event_publisher
                    .publish_audio_unavailable(flow_id, playback_id, reason);
            }
            AcquireOutcome::Discarded => {
                tracing::debug!(
                    flow_id = %flow_id,
                    playback_id = %playback_id,
                    "Playback released before audio arrived"
                );
            }
        }

        outcome
    }

    async fn fetch_and_attach(
        &self,
        playback_id: &str,
        binary_id: &str,
        mime_hint: Option<String>,
    ) -> AcquireOutcome {
        let fetched = match self.workflow.fetch_audio(binary_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                return AcquireOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let mime_type = fetched
            .mime_type
            .or(mime_hint)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        // 时长探测失败不影响播放，由播放器上报 loaded_metadata 补齐
        let duration_seconds = match self.audio_probe.probe(&fetched.data, Some(&mime_type)) {
            Ok(info) => Some(info.duration_secs),
            Err(e) => {
                tracing::debug!(playback_id = %playback_id, error = %e, "Audio probe failed");
                None
            }
        };

        let handle = match self.audio_store.materialize(fetched.data, &mime_type) {
            Ok(handle) => handle,
            Err(e) => {
                return AcquireOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let outcome = self.attach(playback_id, AudioSource::Local { handle }, duration_seconds);
        if outcome == AcquireOutcome::Discarded {
            self.revoke_late_handle(playback_id, handle);
        }
        outcome
    }

    fn attach(
        &self,
        playback_id: &str,
        source: AudioSource,
        duration_seconds: Option<f64>,
    ) -> AcquireOutcome {
        let audio_url = audio_url_for(&source);
        let attached = modify_session(self.playback_store.as_ref(), playback_id, |entry| {
            entry.session.attach_audio(source, duration_seconds)
        });

        match (attached, audio_url) {
            (Ok(Ok(())), Some(audio_url)) => AcquireOutcome::Ready {
                audio_url,
                duration_seconds,
            },
            (Ok(Ok(())), None) => AcquireOutcome::Unavailable {
                reason: "Empty audio source".to_string(),
            },
            _ => AcquireOutcome::Discarded,
        }
    }

    fn revoke_late_handle(&self, playback_id: &str, handle: AudioHandleId) {
        if self.audio_store.revoke(&handle) {
            tracing::debug!(
                playback_id = %playback_id,
                handle = %handle,
                "Late audio handle revoked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::playback::PlaybackSession;
    use crate::infrastructure::adapters::{FakeWorkflowClient, SymphoniaProbe};
    use crate::infrastructure::memory::{InMemoryAudioStore, InMemorySessionStore};

    struct Fixture {
        workflow: Arc<FakeWorkflowClient>,
        audio_store: Arc<InMemoryAudioStore>,
        playback_store: Arc<InMemorySessionStore<PlaybackEntry>>,
        handler: AcquireAudioHandler,
    }

    fn fixture(workflow: FakeWorkflowClient) -> Fixture {
        let workflow = Arc::new(workflow);
        let audio_store = InMemoryAudioStore::new(1024 * 1024).arc();
        let playback_store: Arc<InMemorySessionStore<PlaybackEntry>> =
            InMemorySessionStore::new().arc();
        let handler = AcquireAudioHandler::new(
            workflow.clone(),
            audio_store.clone(),
            Arc::new(SymphoniaProbe::new()),
            playback_store.clone(),
            EventPublisher::new().arc(),
        );
        Fixture {
            workflow,
            audio_store,
            playback_store,
            handler,
        }
    }

    fn insert_playback(store: &InMemorySessionStore<PlaybackEntry>) -> String {
        let session = PlaybackSession::new("Breathe in. Breathe out.", None);
        store.create(PlaybackEntry::new("flow-1", session)).unwrap()
    }

    fn binary(id: &str) -> AudioDescriptor {
        AudioDescriptor::Binary {
            binary_id: id.to_string(),
            mime_type: Some("audio/wav".to_string()),
        }
    }

    #[tokio::test]
    async fn test_binary_audio_materialized_and_attached() {
        let fx = fixture(FakeWorkflowClient::new());
        let id = insert_playback(&fx.playback_store);

        let outcome = fx.handler.acquire("flow-1", &id, binary("bin-1")).await;
        let AcquireOutcome::Ready { audio_url, duration_seconds } = outcome else {
            panic!("expected audio to be ready");
        };
        assert!(audio_url.starts_with("/api/audio/"));
        // 假客户端返回 1 秒静音 WAV
        let duration = duration_seconds.unwrap();
        assert!((duration - 1.0).abs() < 0.01);

        let entry = fx.playback_store.get(&id).unwrap();
        assert!(entry.session.has_audio());
        assert_eq!(fx.audio_store.count(), 1);
        assert_eq!(fx.workflow.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_direct_url_used_as_is() {
        let fx = fixture(FakeWorkflowClient::new());
        let id = insert_playback(&fx.playback_store);

        let outcome = fx
            .handler
            .acquire(
                "flow-1",
                &id,
                AudioDescriptor::Direct {
                    url: "https://cdn.example.com/m.mp3".to_string(),
                },
            )
            .await;
        assert_eq!(
            outcome,
            AcquireOutcome::Ready {
                audio_url: "https://cdn.example.com/m.mp3".to_string(),
                duration_seconds: None,
            }
        );
        assert_eq!(fx.workflow.fetch_count(), 0);
        assert_eq!(fx.audio_store.count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_text_only() {
        let fx = fixture(FakeWorkflowClient::new().with_failing_audio());
        let id = insert_playback(&fx.playback_store);

        let outcome = fx.handler.acquire("flow-1", &id, binary("bin-1")).await;
        assert!(matches!(outcome, AcquireOutcome::Unavailable { .. }));

        let entry = fx.playback_store.get(&id).unwrap();
        assert!(!entry.session.has_audio());
        assert_eq!(entry.session.segments().len(), 2);
    }

    #[tokio::test]
    async fn test_late_audio_revoked_after_release() {
        let fx = fixture(FakeWorkflowClient::new());
        let id = insert_playback(&fx.playback_store);
        fx.playback_store.remove(&id);

        let outcome = fx.handler.acquire("flow-1", &id, binary("bin-1")).await;
        assert_eq!(outcome, AcquireOutcome::Discarded);
        assert_eq!(fx.audio_store.count(), 0);
    }
}
