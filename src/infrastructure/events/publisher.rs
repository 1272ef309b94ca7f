//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现：每个表单一个广播通道

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// WebSocket 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    /// 当前步骤变化（含自动前进）
    StepChanged {
        flow_id: String,
        current_index: usize,
        step_id: String,
        auto: bool,
    },
    /// 开始提交
    SubmissionStarted { flow_id: String },
    /// 提交成功
    SubmissionCompleted {
        flow_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        playback_id: Option<String>,
    },
    /// 提交失败
    SubmissionFailed { flow_id: String, error: String },
    /// 音频可播放
    AudioReady {
        flow_id: String,
        playback_id: String,
        audio_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<f64>,
    },
    /// 音频不可用，仅展示文本
    AudioUnavailable {
        flow_id: String,
        playback_id: String,
        reason: String,
    },
    /// 播放进度与高亮
    PlaybackProgress {
        flow_id: String,
        playback_id: String,
        position_seconds: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        active_segment: Option<usize>,
        is_playing: bool,
    },
    /// 请求播放器跳转
    SeekRequested {
        flow_id: String,
        playback_id: String,
        position_seconds: f64,
    },
    /// 播放会话已释放
    PlaybackReleased { flow_id: String, playback_id: String },
    /// 表单关闭
    FlowClosed { flow_id: String, reason: String },
}

/// 事件发布器
pub struct EventPublisher {
    /// flow_id -> broadcast sender
    flow_channels: DashMap<String, broadcast::Sender<WsEvent>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            flow_channels: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册表单的事件通道
    pub fn register_flow(&self, flow_id: &str) -> broadcast::Receiver<WsEvent> {
        if let Some(sender) = self.flow_channels.get(flow_id) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(100);
        self.flow_channels.insert(flow_id.to_string(), tx);
        rx
    }

    /// 取消注册表单
    pub fn unregister_flow(&self, flow_id: &str) {
        self.flow_channels.remove(flow_id);
    }

    /// 获取表单的事件接收器
    pub fn subscribe(&self, flow_id: &str) -> Option<broadcast::Receiver<WsEvent>> {
        self.flow_channels.get(flow_id).map(|s| s.subscribe())
    }

    /// 发布步骤变化事件
    pub fn publish_step_changed(&self, flow_id: &str, current_index: usize, step_id: &str, auto: bool) {
        self.publish_to_flow(
            flow_id,
            WsEvent::StepChanged {
                flow_id: flow_id.to_string(),
                current_index,
                step_id: step_id.to_string(),
                auto,
            },
        );
    }

    /// 发布开始提交事件
    pub fn publish_submission_started(&self, flow_id: &str) {
        self.publish_to_flow(
            flow_id,
            WsEvent::SubmissionStarted {
                flow_id: flow_id.to_string(),
            },
        );
    }

    /// 发布提交成功事件
    pub fn publish_submission_completed(&self, flow_id: &str, playback_id: Option<&str>) {
        self.publish_to_flow(
            flow_id,
            WsEvent::SubmissionCompleted {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.map(|s| s.to_string()),
            },
        );
    }

    /// 发布提交失败事件
    pub fn publish_submission_failed(&self, flow_id: &str, error: &str) {
        self.publish_to_flow(
            flow_id,
            WsEvent::SubmissionFailed {
                flow_id: flow_id.to_string(),
                error: error.to_string(),
            },
        );
    }

    /// 发布音频就绪事件
    pub fn publish_audio_ready(
        &self,
        flow_id: &str,
        playback_id: &str,
        audio_url: &str,
        duration_seconds: Option<f64>,
    ) {
        self.publish_to_flow(
            flow_id,
            WsEvent::AudioReady {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.to_string(),
                audio_url: audio_url.to_string(),
                duration_seconds,
            },
        );
    }

    /// 发布音频不可用事件
    pub fn publish_audio_unavailable(&self, flow_id: &str, playback_id: &str, reason: &str) {
        self.publish_to_flow(
            flow_id,
            WsEvent::AudioUnavailable {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.to_string(),
                reason: reason.to_string(),
            },
        );
    }

    /// 发布播放进度事件
    pub fn publish_playback_progress(
        &self,
        flow_id: &str,
        playback_id: &str,
        position_seconds: f64,
        active_segment: Option<usize>,
        is_playing: bool,
    ) {
        self.publish_to_flow(
            flow_id,
            WsEvent::PlaybackProgress {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.to_string(),
                position_seconds,
                active_segment,
                is_playing,
            },
        );
    }

    /// 发布跳转请求事件
    pub fn publish_seek_requested(&self, flow_id: &str, playback_id: &str, position_seconds: f64) {
        self.publish_to_flow(
            flow_id,
            WsEvent::SeekRequested {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.to_string(),
                position_seconds,
            },
        );
    }

    /// 发布播放会话释放事件
    pub fn publish_playback_released(&self, flow_id: &str, playback_id: &str) {
        self.publish_to_flow(
            flow_id,
            WsEvent::PlaybackReleased {
                flow_id: flow_id.to_string(),
                playback_id: playback_id.to_string(),
            },
        );
    }

    /// 发布表单关闭事件
    pub fn publish_flow_closed(&self, flow_id: &str, reason: &str) {
        self.publish_to_flow(
            flow_id,
            WsEvent::FlowClosed {
                flow_id: flow_id.to_string(),
                reason: reason.to_string(),
            },
        );
    }

    /// 发布事件到指定表单
    fn publish_to_flow(&self, flow_id: &str, event: WsEvent) {
        if let Some(sender) = self.flow_channels.get(flow_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    flow_id = %flow_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_routed_per_flow() {
        let publisher = EventPublisher::new();
        let mut rx_a = publisher.register_flow("a");
        let mut rx_b = publisher.register_flow("b");

        publisher.publish_step_changed("a", 2, "feeling", true);

        assert_eq!(
            rx_a.recv().await.unwrap(),
            WsEvent::StepChanged {
                flow_id: "a".to_string(),
                current_index: 2,
                step_id: "feeling".to_string(),
                auto: true,
            }
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_unregistered_flow_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish_flow_closed("missing", "client_close");
        assert!(publisher.subscribe("missing").is_none());
    }

    #[test]
    fn test_event_wire_format() {
        let event = WsEvent::SeekRequested {
            flow_id: "f".to_string(),
            playback_id: "p".to_string(),
            position_seconds: 30.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "seek_requested");
        assert_eq!(json["data"]["position_seconds"], 30.0);
    }
}
