//! Submit Flow Handler
//!
//! 同一表单同时只允许一个提交；提交期间的重复请求直接拒绝，不会发出网络调用

use std::sync::Arc;

use super::{AcquireAudioHandler, ReleasePlaybackHandler};
use crate::application::commands::flow_commands::*;
use crate::application::commands::playback_commands::PlaybackView;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    modify_session, AudioDescriptor, FlowSession, PlaybackEntry, SessionStorePort,
    SubmissionError, WorkflowPort,
};
use crate::domain::flow::SubmissionContext;
use crate::domain::playback::PlaybackSession;
use crate::infrastructure::events::EventPublisher;

/// 提交标记守卫：无论成功、失败还是请求被中途取消，离开作用域时都清除 submitting
struct SubmittingGuard {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    flow_id: String,
    armed: bool,
}

impl Drop for SubmittingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let _ = self
            .flow_store
            .update(&self.flow_id, &mut |session: &mut FlowSession| {
                session.submitting = false
            });
    }
}

/// SubmitFlow Handler
pub struct SubmitFlowHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    workflow: Arc<dyn WorkflowPort>,
    audio_acquirer: Arc<AcquireAudioHandler>,
    playback_releaser: Arc<ReleasePlaybackHandler>,
    event_publisher: Arc<EventPublisher>,
    context: SubmissionContext,
}

impl SubmitFlowHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        workflow: Arc<dyn WorkflowPort>,
        audio_acquirer: Arc<AcquireAudioHandler>,
        playback_releaser: Arc<ReleasePlaybackHandler>,
        event_publisher: Arc<EventPublisher>,
        context: SubmissionContext,
    ) -> Self {
        Self {
            flow_store,
            playback_store,
            workflow,
            audio_acquirer,
            playback_releaser,
            event_publisher,
            context,
        }
    }

    pub async fn handle(&self, cmd: SubmitFlowCommand) -> Result<SubmitFlowResponse, ApplicationError> {
        let flow_id = cmd.flow_id;

        // 原子地校验 + 置位 submitting
        let (payload, previous_playback) =
            modify_session(self.flow_store.as_ref(), &flow_id, |session| -> Result<_, ApplicationError> {
                if session.submitting {
                    return Err(ApplicationError::busy(format!(
                        "Submission already in progress for flow {}",
                        session.id
                    )));
                }
                let payload = session.state.build_submission_payload(&self.context)?;
                session.state.cancel_pending();
                session.submitting = true;
                Ok((payload, session.playback_id.take()))
            })
            .map_err(|e| ApplicationError::from_session("Flow", e))??;

        let mut guard = SubmittingGuard {
            flow_store: self.flow_store.clone(),
            flow_id: flow_id.clone(),
            armed: true,
        };

        // 重新提交替换旧结果
        if let Some(previous) = previous_playback {
            self.playback_releaser.release(&previous.to_string());
        }

        self.event_publisher.publish_submission_started(&flow_id);
        tracing::info!(flow_id = %flow_id, fields = payload.len(), "Submitting flow");

        let item = match self.workflow.submit(&payload).await {
            Ok(items) => match items.into_iter().next() {
                Some(item) => item,
                None => {
                    let err = SubmissionError::InvalidResponse("Empty response array".to_string());
                    return Err(self.fail(&flow_id, err));
                }
            },
            Err(e) => return Err(self.fail(&flow_id, e)),
        };

        // 有冥想文本即创建播放会话；音频在后台获取
        let playback = item.meditation.as_ref().map(|meditation| {
            PlaybackSession::new(&meditation.tool_text, meditation.metadata.duration_sec)
        });
        let descriptor = item.audio_descriptor();

        let playback_entry = match playback {
            Some(session) => {
                let entry = PlaybackEntry::new(flow_id.clone(), session);
                self.playback_store
                    .create(entry.clone())
                    .map_err(|e| ApplicationError::internal(e.to_string()))?;
                Some(entry)
            }
            None => None,
        };
        let playback_id = playback_entry.as_ref().map(|entry| entry.session.id());

        let stored = modify_session(self.flow_store.as_ref(), &flow_id, |session| {
            session.response = Some(item.clone());
            session.playback_id = playback_id;
            session.submitting = false;
            FlowView::from_session(session)
        });

        let flow = match stored {
            Ok(flow) => {
                guard.armed = false;
                flow
            }
            Err(e) => {
                // 提交期间表单已关闭
                if let Some(entry) = &playback_entry {
                    self.playback_releaser.release(&entry.id);
                }
                return Err(ApplicationError::from_session("Flow", e));
            }
        };

        let playback_view = playback_entry.as_ref().map(PlaybackView::from_entry);
        self.event_publisher
            .publish_submission_completed(&flow_id, playback_entry.as_ref().map(|e| e.id.as_str()));

        if let Some(entry) = playback_entry {
            let acquirer = self.audio_acquirer.clone();
            let flow_id = flow_id.clone();
            tokio::spawn(async move {
                acquirer.acquire(&flow_id, &entry.id, descriptor).await;
            });
        } else if descriptor != AudioDescriptor::None {
            tracing::warn!(flow_id = %flow_id, "Response has audio but no meditation text");
        }

        tracing::info!(
            flow_id = %flow_id,
            playback_id = ?flow.playback_id,
            "Flow submitted"
        );

        Ok(SubmitFlowResponse {
            flow,
            playback: playback_view,
        })
    }

    fn fail(&self, flow_id: &str, err: SubmissionError) -> ApplicationError {
        tracing::error!(flow_id = %flow_id, error = %err, "Submission failed");
        self.event_publisher
            .publish_submission_failed(flow_id, &err.to_string());
        ApplicationError::from(err)
    }
}
