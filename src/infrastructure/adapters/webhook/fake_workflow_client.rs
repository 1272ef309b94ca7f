//! Fake Workflow Client - 演示模式与测试用的工作流客户端
//!
//! 不访问网络：提交返回固定的示例响应，音频拉取返回一段静音 WAV

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::application::ports::{
    AudioFetchError, FetchedAudio, SubmissionError, WorkflowItem, WorkflowPort,
};
use crate::domain::flow::SubmissionPayload;

/// 示例工作流响应
const DEMO_RESPONSE: &str = r#"[
  {
    "mimeType": "audio/mp3",
    "fileType": "audio",
    "fileExtension": "mp3",
    "fileName": "audio.mp3",
    "id": "filesystem-v2:workflows/AKqi4mYvohKhq2pC/executions/52/binary_data/d47d90c3-ce1e-4b57-b93f-3fb5b1ffbb62",
    "fileSize": "1.51 MB",
    "affirmation": {
      "tool_type": "affirmation",
      "tool_text": "I am validated and enough, no matter my pace. I trust my journey and give myself permission to rest when I need it. I release worry and embrace relief.",
      "metadata": {
        "source": "quick_shift",
        "tags": ["validation", "relief", "trust"],
        "start_phrase": "I am",
        "duration_sec": null,
        "escalation_flag": false
      }
    },
    "meditation": {
      "tool_type": "meditation",
      "tool_text": "Find a comfortable seat and gently close your eyes if it feels safe. Begin by bringing your attention to your breath. Take a deep inhalation, filling your lungs fully, and then exhale slowly and completely. Repeat this breathing pattern three more times, letting your body settle deeper with each breath. [pause] Now bring your focus to the sensations in your body. Notice the weight of your body where it connects with the surface beneath you. Feel the support holding you up, steady and strong. Allow yourself to feel grounded in this moment. [pause] Imagine a calm river flowing gently near you. See its clear water moving smoothly, carrying any feelings of worry away from you. The river flows with ease and confidence, just like your own path. Breathe in the sense of relief that comes as you watch the water move. [pause] Feel how this relief softens your tired body. Let your shoulders relax and your jaw unclench. With each breath, you feel lighter and more validated. Your pace is yours, and that is enough. [pause] When you are ready, begin to bring your attention back to your breath. Notice its rhythm once again. Slowly open your eyes if closed, and carry the feeling of calm with you. Remember, you are validated and safe.",
      "metadata": {
        "source": "quick_shift",
        "tags": ["grounding", "short-guided"],
        "duration_sec": 190,
        "tts_ready": true,
        "escalation_flag": false,
        "safe_response_template": null
      }
    }
  }
]"#;

const FAKE_SAMPLE_RATE: u32 = 16_000;

/// 生成单声道 16-bit PCM 静音 WAV
pub fn silent_wav(sample_rate: u32, duration_ms: u32) -> Vec<u8> {
    let samples = (sample_rate as u64 * duration_ms as u64 / 1000) as u32;
    let data_len = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

/// Fake Workflow Client
pub struct FakeWorkflowClient {
    latency: Duration,
    fail_submit: bool,
    fail_audio: bool,
    gate: Option<Arc<Notify>>,
    submit_count: AtomicUsize,
    fetch_count: AtomicUsize,
    last_payload: Mutex<Option<SubmissionPayload>>,
}

impl FakeWorkflowClient {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_submit: false,
            fail_audio: false,
            gate: None,
            submit_count: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }

    /// 模拟生成延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 提交总是失败（模拟工作流未激活）
    pub fn with_failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// 音频拉取总是失败
    pub fn with_failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    /// 提交在收到通知前挂起
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<SubmissionPayload> {
        self.last_payload.lock().ok().and_then(|p| p.clone())
    }

    /// 示例响应
    pub fn demo_response() -> Result<Vec<WorkflowItem>, SubmissionError> {
        serde_json::from_str(DEMO_RESPONSE)
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }
}

impl Default for FakeWorkflowClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowPort for FakeWorkflowClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Vec<WorkflowItem>, SubmissionError> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_payload.lock() {
            *last = Some(payload.clone());
        }

        tracing::debug!(fields = payload.len(), "FakeWorkflowClient: returning demo response");

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_submit {
            return Err(SubmissionError::EndpointNotFound);
        }
        Self::demo_response()
    }

    async fn fetch_audio(&self, binary_id: &str) -> Result<FetchedAudio, AudioFetchError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(binary_id = %binary_id, "FakeWorkflowClient: returning silent audio");

        if self.fail_audio {
            return Err(AudioFetchError::NetworkError("connection refused".to_string()));
        }
        Ok(FetchedAudio {
            data: silent_wav(FAKE_SAMPLE_RATE, 1000),
            mime_type: Some("audio/wav".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AudioDescriptor;

    #[test]
    fn test_demo_response_parses() {
        let items = FakeWorkflowClient::demo_response().unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        let affirmation = item.affirmation.as_ref().unwrap();
        assert_eq!(affirmation.metadata.start_phrase.as_deref(), Some("I am"));
        assert_eq!(affirmation.metadata.duration_sec, None);
        assert_eq!(
            affirmation.metadata.extra.get("escalation_flag"),
            Some(&serde_json::Value::Bool(false))
        );

        let meditation = item.meditation.as_ref().unwrap();
        assert_eq!(meditation.metadata.duration_sec, Some(190.0));
        assert!(matches!(item.audio_descriptor(), AudioDescriptor::Binary { .. }));
    }

    #[test]
    fn test_silent_wav_layout() {
        let wav = silent_wav(8000, 500);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 8000 Hz * 0.5 s * 2 bytes
        assert_eq!(wav.len(), 44 + 8000);
    }

    #[tokio::test]
    async fn test_failing_audio() {
        let client = FakeWorkflowClient::new().with_failing_audio();
        let result = client.fetch_audio("bin-1").await;
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(client.fetch_count(), 1);
        assert_eq!(client.submit_count(), 0);
    }
}
