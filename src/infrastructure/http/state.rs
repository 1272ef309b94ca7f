//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;
use std::time::Duration;

use crate::application::{
    // Command handlers
    AcquireAudioHandler, ApplyAutoAdvanceHandler, CloseFlowHandler, NavigateHandler,
    PlaybackControlHandler, ReleasePlaybackHandler, ResetFlowHandler, SelectAnswerHandler,
    StartFlowHandler, SubmitFlowHandler, ToggleMultiSelectHandler,
    // Query handlers
    GetAudioHandler, GetCatalogHandler, GetFlowHandler, GetPlaybackHandler,
    // Ports
    AudioProbePort, AudioStorePort, AutoAdvancePort, FlowSession, PlaybackEntry,
    SessionStorePort, WorkflowPort,
};
use crate::domain::flow::{StepCatalog, SubmissionContext};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::memory::TokioAutoAdvanceScheduler;

/// 表单行为设置
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// 单选 / 勾选后自动前进的延迟
    pub auto_advance_delay: Duration,
    /// 每次提交附带的固定上下文
    pub submission_context: SubmissionContext,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            auto_advance_delay: Duration::from_millis(300),
            submission_context: SubmissionContext::new("test"),
        }
    }
}

/// 应用状态
///
/// 表单会话、播放会话与音频句柄均为内存实现
pub struct AppState {
    // ========== Ports ==========
    pub flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    pub playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    pub audio_store: Arc<dyn AudioStorePort>,
    pub workflow: Arc<dyn WorkflowPort>,
    pub auto_advance: Arc<dyn AutoAdvancePort>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub start_flow_handler: StartFlowHandler,
    pub select_answer_handler: SelectAnswerHandler,
    pub toggle_multi_select_handler: ToggleMultiSelectHandler,
    pub navigate_handler: NavigateHandler,
    pub reset_flow_handler: ResetFlowHandler,
    pub submit_flow_handler: SubmitFlowHandler,
    pub close_flow_handler: Arc<CloseFlowHandler>,
    pub playback_control_handler: PlaybackControlHandler,
    pub release_playback_handler: Arc<ReleasePlaybackHandler>,

    // ========== Query Handlers ==========
    pub get_catalog_handler: GetCatalogHandler,
    pub get_flow_handler: GetFlowHandler,
    pub get_playback_handler: GetPlaybackHandler,
    pub get_audio_handler: GetAudioHandler,
}

impl AppState {
    /// 创建应用状态
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<StepCatalog>,
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        audio_store: Arc<dyn AudioStorePort>,
        workflow: Arc<dyn WorkflowPort>,
        audio_probe: Arc<dyn AudioProbePort>,
        event_publisher: Arc<EventPublisher>,
        settings: FlowSettings,
    ) -> Self {
        let applier = Arc::new(ApplyAutoAdvanceHandler::new(
            flow_store.clone(),
            event_publisher.clone(),
        ));
        let auto_advance: Arc<dyn AutoAdvancePort> =
            TokioAutoAdvanceScheduler::new(applier).arc();

        let release_playback_handler = Arc::new(ReleasePlaybackHandler::new(
            playback_store.clone(),
            flow_store.clone(),
            audio_store.clone(),
            event_publisher.clone(),
        ));
        let audio_acquirer = Arc::new(AcquireAudioHandler::new(
            workflow.clone(),
            audio_store.clone(),
            audio_probe,
            playback_store.clone(),
            event_publisher.clone(),
        ));

        Self {
            // Ports
            flow_store: flow_store.clone(),
            playback_store: playback_store.clone(),
            audio_store: audio_store.clone(),
            workflow: workflow.clone(),
            auto_advance: auto_advance.clone(),
            event_publisher: event_publisher.clone(),

            // Command handlers
            start_flow_handler: StartFlowHandler::new(catalog.clone(), flow_store.clone()),
            select_answer_handler: SelectAnswerHandler::new(
                flow_store.clone(),
                auto_advance.clone(),
                settings.auto_advance_delay,
            ),
            toggle_multi_select_handler: ToggleMultiSelectHandler::new(
                flow_store.clone(),
                auto_advance.clone(),
            ),
            navigate_handler: NavigateHandler::new(
                flow_store.clone(),
                auto_advance.clone(),
                event_publisher.clone(),
            ),
            reset_flow_handler: ResetFlowHandler::new(
                flow_store.clone(),
                auto_advance.clone(),
                release_playback_handler.clone(),
                event_publisher.clone(),
            ),
            submit_flow_handler: SubmitFlowHandler::new(
                flow_store.clone(),
                playback_store.clone(),
                workflow,
                audio_acquirer,
                release_playback_handler.clone(),
                event_publisher.clone(),
                settings.submission_context,
            ),
            close_flow_handler: Arc::new(CloseFlowHandler::new(
                flow_store.clone(),
                auto_advance,
                release_playback_handler.clone(),
                event_publisher.clone(),
            )),
            playback_control_handler: PlaybackControlHandler::new(
                playback_store.clone(),
                event_publisher,
            ),
            release_playback_handler,

            // Query handlers
            get_catalog_handler: GetCatalogHandler::new(catalog),
            get_flow_handler: GetFlowHandler::new(flow_store),
            get_playback_handler: GetPlaybackHandler::new(playback_store),
            get_audio_handler: GetAudioHandler::new(audio_store),
        }
    }
}
