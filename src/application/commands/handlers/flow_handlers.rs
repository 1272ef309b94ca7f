//! Flow Command Handlers

use std::sync::Arc;
use std::time::Duration;

use super::ReleasePlaybackHandler;
use crate::application::commands::flow_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{modify_session, AutoAdvancePort, FlowSession, SessionStorePort};
use crate::domain::flow::{AdvanceTicket, FlowState, StepCatalog};
use crate::infrastructure::events::EventPublisher;

fn flow_not_found(err: crate::application::ports::SessionError) -> ApplicationError {
    ApplicationError::from_session("Flow", err)
}

fn ensure_idle(session: &FlowSession) -> Result<(), ApplicationError> {
    if session.submitting {
        return Err(ApplicationError::busy(format!(
            "Submission in progress for flow {}",
            session.id
        )));
    }
    Ok(())
}

/// StartFlow Handler - 创建新表单
pub struct StartFlowHandler {
    catalog: Arc<StepCatalog>,
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
}

impl StartFlowHandler {
    pub fn new(catalog: Arc<StepCatalog>, flow_store: Arc<dyn SessionStorePort<FlowSession>>) -> Self {
        Self {
            catalog,
            flow_store,
        }
    }

    pub async fn handle(&self, _cmd: StartFlowCommand) -> Result<FlowView, ApplicationError> {
        let state = FlowState::new(self.catalog.clone())?;
        let session = FlowSession::new(state);
        let view = FlowView::from_session(&session);

        let flow_id = self
            .flow_store
            .create(session)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;

        tracing::info!(
            flow_id = %flow_id,
            visible_steps = view.visible_steps.len(),
            "Flow started"
        );
        Ok(view)
    }
}

/// SelectAnswer Handler - 记录回答并按需调度自动前进
pub struct SelectAnswerHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    auto_advance: Arc<dyn AutoAdvancePort>,
    auto_advance_delay: Duration,
}

impl SelectAnswerHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        auto_advance: Arc<dyn AutoAdvancePort>,
        auto_advance_delay: Duration,
    ) -> Self {
        Self {
            flow_store,
            auto_advance,
            auto_advance_delay,
        }
    }

    pub async fn handle(&self, cmd: SelectAnswerCommand) -> Result<FlowView, ApplicationError> {
        let (ticket, view) = modify_session(self.flow_store.as_ref(), &cmd.flow_id, |session| {
            ensure_idle(session)?;
            let ticket = session.state.select_answer(&cmd.step_id, cmd.value)?;
            Ok::<_, ApplicationError>((ticket, FlowView::from_session(session)))
        })
        .map_err(flow_not_found)??;

        // 新的交互总是取代旧的挂起任务
        match ticket {
            Some(ticket) => {
                self.auto_advance
                    .schedule(&cmd.flow_id, ticket, self.auto_advance_delay)
            }
            None => {
                self.auto_advance.cancel(&cmd.flow_id);
            }
        }

        tracing::debug!(
            flow_id = %cmd.flow_id,
            step_id = %cmd.step_id,
            auto_advance = ticket.is_some(),
            "Answer recorded"
        );
        Ok(view)
    }
}

/// ToggleMultiSelect Handler - 多选切换（不自动前进）
pub struct ToggleMultiSelectHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    auto_advance: Arc<dyn AutoAdvancePort>,
}

impl ToggleMultiSelectHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        auto_advance: Arc<dyn AutoAdvancePort>,
    ) -> Self {
        Self {
            flow_store,
            auto_advance,
        }
    }

    pub async fn handle(&self, cmd: ToggleMultiSelectCommand) -> Result<FlowView, ApplicationError> {
        let view = modify_session(self.flow_store.as_ref(), &cmd.flow_id, |session| {
            ensure_idle(session)?;
            session.state.toggle_multi_select(&cmd.step_id, &cmd.value)?;
            Ok::<_, ApplicationError>(FlowView::from_session(session))
        })
        .map_err(flow_not_found)??;

        self.auto_advance.cancel(&cmd.flow_id);

        tracing::debug!(
            flow_id = %cmd.flow_id,
            step_id = %cmd.step_id,
            value = %cmd.value,
            "Multi-select toggled"
        );
        Ok(view)
    }
}

/// Navigate Handler - 前进 / 后退 / 跳过
pub struct NavigateHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    auto_advance: Arc<dyn AutoAdvancePort>,
    event_publisher: Arc<EventPublisher>,
}

impl NavigateHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        auto_advance: Arc<dyn AutoAdvancePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            flow_store,
            auto_advance,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: NavigateCommand) -> Result<FlowView, ApplicationError> {
        // 手动导航取代挂起的自动前进
        self.auto_advance.cancel(&cmd.flow_id);

        let (moved, view) = modify_session(self.flow_store.as_ref(), &cmd.flow_id, |session| {
            ensure_idle(session)?;
            let before = session.state.current_index();
            let after = match cmd.navigation {
                Navigation::Next => session.state.go_next()?,
                Navigation::Previous => session.state.go_previous(),
                Navigation::Skip => session.state.skip()?,
            };
            Ok::<_, ApplicationError>((before != after, FlowView::from_session(session)))
        })
        .map_err(flow_not_found)??;

        if moved {
            self.event_publisher.publish_step_changed(
                &cmd.flow_id,
                view.current_index,
                view.current_step.id.as_str(),
                false,
            );
        }

        tracing::debug!(
            flow_id = %cmd.flow_id,
            navigation = ?cmd.navigation,
            current_index = view.current_index,
            "Flow navigated"
        );
        Ok(view)
    }
}

/// ApplyAutoAdvance Handler - 延迟到期后执行自动前进
pub struct ApplyAutoAdvanceHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    event_publisher: Arc<EventPublisher>,
}

impl ApplyAutoAdvanceHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            flow_store,
            event_publisher,
        }
    }

    /// 票据已被取代或表单已关闭时返回 false
    pub fn handle(&self, flow_id: &str, ticket: AdvanceTicket) -> bool {
        let advanced = modify_session(self.flow_store.as_ref(), flow_id, |session| {
            if session.submitting || !session.state.apply_auto_advance(ticket) {
                return None;
            }
            Some((
                session.state.current_index(),
                session.state.current_step().id.to_string(),
            ))
        });

        match advanced {
            Ok(Some((current_index, step_id))) => {
                self.event_publisher
                    .publish_step_changed(flow_id, current_index, &step_id, true);
                tracing::debug!(
                    flow_id = %flow_id,
                    ticket = ticket.value(),
                    current_index = current_index,
                    "Auto advanced"
                );
                true
            }
            _ => false,
        }
    }
}

/// ResetFlow Handler - 清空回答并释放播放会话（"Create Another"）
pub struct ResetFlowHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    auto_advance: Arc<dyn AutoAdvancePort>,
    playback_releaser: Arc<ReleasePlaybackHandler>,
    event_publisher: Arc<EventPublisher>,
}

impl ResetFlowHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        auto_advance: Arc<dyn AutoAdvancePort>,
        playback_releaser: Arc<ReleasePlaybackHandler>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            flow_store,
            auto_advance,
            playback_releaser,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ResetFlowCommand) -> Result<FlowView, ApplicationError> {
        let (playback_id, view) = modify_session(self.flow_store.as_ref(), &cmd.flow_id, |session| {
            ensure_idle(session)?;
            session.state.reset();
            session.response = None;
            let playback_id = session.playback_id.take();
            Ok::<_, ApplicationError>((playback_id, FlowView::from_session(session)))
        })
        .map_err(flow_not_found)??;

        self.auto_advance.cancel(&cmd.flow_id);
        if let Some(playback_id) = playback_id {
            self.playback_releaser.release(&playback_id.to_string());
        }

        self.event_publisher.publish_step_changed(
            &cmd.flow_id,
            view.current_index,
            view.current_step.id.as_str(),
            false,
        );

        tracing::info!(flow_id = %cmd.flow_id, "Flow reset");
        Ok(view)
    }
}

/// CloseFlow Handler - 关闭表单
pub struct CloseFlowHandler {
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    auto_advance: Arc<dyn AutoAdvancePort>,
    playback_releaser: Arc<ReleasePlaybackHandler>,
    event_publisher: Arc<EventPublisher>,
}

impl CloseFlowHandler {
    pub fn new(
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        auto_advance: Arc<dyn AutoAdvancePort>,
        playback_releaser: Arc<ReleasePlaybackHandler>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            flow_store,
            auto_advance,
            playback_releaser,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: CloseFlowCommand) -> Result<CloseFlowResponse, ApplicationError> {
        let session = self
            .flow_store
            .remove(&cmd.flow_id)
            .ok_or_else(|| ApplicationError::not_found("Flow", &cmd.flow_id))?;

        self.auto_advance.cancel(&cmd.flow_id);
        let released_playback = session
            .playback_id
            .map(|id| self.playback_releaser.release(&id.to_string()))
            .unwrap_or(false);

        // 先通知再注销通道
        self.event_publisher
            .publish_flow_closed(&cmd.flow_id, &cmd.reason);
        self.event_publisher.unregister_flow(&cmd.flow_id);

        tracing::info!(
            flow_id = %cmd.flow_id,
            reason = %cmd.reason,
            released_playback = released_playback,
            "Flow closed"
        );

        Ok(CloseFlowResponse {
            flow_id: cmd.flow_id,
            released_playback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::AnswerValue;
    use crate::infrastructure::events::WsEvent;
    use crate::infrastructure::memory::{
        InMemoryAudioStore, InMemorySessionStore, TokioAutoAdvanceScheduler,
    };
    use crate::application::ports::PlaybackEntry;

    struct Fixture {
        flow_store: Arc<InMemorySessionStore<FlowSession>>,
        scheduler: Arc<TokioAutoAdvanceScheduler>,
        publisher: Arc<EventPublisher>,
        releaser: Arc<ReleasePlaybackHandler>,
    }

    impl Fixture {
        fn new() -> Self {
            let flow_store: Arc<InMemorySessionStore<FlowSession>> = InMemorySessionStore::new().arc();
            let playback_store: Arc<InMemorySessionStore<PlaybackEntry>> =
                InMemorySessionStore::new().arc();
            let publisher = EventPublisher::new().arc();
            let applier = Arc::new(ApplyAutoAdvanceHandler::new(
                flow_store.clone(),
                publisher.clone(),
            ));
            let scheduler = TokioAutoAdvanceScheduler::new(applier).arc();
            let releaser = Arc::new(ReleasePlaybackHandler::new(
                playback_store,
                flow_store.clone(),
                InMemoryAudioStore::new(1024).arc(),
                publisher.clone(),
            ));
            Self {
                flow_store,
                scheduler,
                publisher,
                releaser,
            }
        }

        async fn start(&self) -> String {
            StartFlowHandler::new(Arc::new(StepCatalog::tap_in_default()), self.flow_store.clone())
                .handle(StartFlowCommand)
                .await
                .unwrap()
                .flow_id
        }

        fn select(&self) -> SelectAnswerHandler {
            SelectAnswerHandler::new(
                self.flow_store.clone(),
                self.scheduler.clone(),
                Duration::from_millis(300),
            )
        }

        fn navigate(&self) -> NavigateHandler {
            NavigateHandler::new(
                self.flow_store.clone(),
                self.scheduler.clone(),
                self.publisher.clone(),
            )
        }

        fn current_index(&self, flow_id: &str) -> usize {
            self.flow_store.get(flow_id).unwrap().state.current_index()
        }
    }

    fn answer(flow_id: &str, step_id: &str, value: &str) -> SelectAnswerCommand {
        SelectAnswerCommand {
            flow_id: flow_id.to_string(),
            step_id: step_id.to_string(),
            value: AnswerValue::from(value),
        }
    }

    fn nav(flow_id: &str, navigation: Navigation) -> NavigateCommand {
        NavigateCommand {
            flow_id: flow_id.to_string(),
            navigation,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_after_delay() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;
        let mut rx = fx.publisher.register_flow(&flow_id);

        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        let view = fx.select().handle(answer(&flow_id, "source", "quick_shift")).await.unwrap();
        assert!(view.auto_advance_pending);
        assert_eq!(view.current_index, 1);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(fx.current_index(&flow_id), 2);

        let mut auto_events = 0;
        while let Ok(event) = rx.try_recv() {
            if let WsEvent::StepChanged { auto: true, step_id, .. } = event {
                assert_eq!(step_id, "loop");
                auto_events += 1;
            }
        }
        assert_eq!(auto_events, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_next_supersedes_auto_advance() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;

        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "source", "quick_shift")).await.unwrap();
        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        assert_eq!(fx.current_index(&flow_id), 2);

        tokio::time::sleep(Duration::from_millis(500)).await;
        // 只前进了一步
        assert_eq!(fx.current_index(&flow_id), 2);
        assert_eq!(fx.scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_reselect_advances_once() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;

        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "source", "plot_twist")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fx.select().handle(answer(&flow_id, "source", "quick_shift")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let session = fx.flow_store.get(&flow_id).unwrap();
        assert_eq!(session.state.current_index(), 2);
        assert_eq!(session.state.current_step().id.as_str(), "loop");
    }

    #[tokio::test]
    async fn test_next_rejected_without_answer() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;
        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();

        let result = fx.navigate().handle(nav(&flow_id, Navigation::Next)).await;
        assert!(matches!(result, Err(ApplicationError::BusinessRuleViolation(_))));
        assert_eq!(fx.current_index(&flow_id), 1);
    }

    #[tokio::test]
    async fn test_toggle_and_skip() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;
        let navigate = fx.navigate();
        navigate.handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "source", "plot_twist")).await.unwrap();
        navigate.handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "quest_response", "tried")).await.unwrap();
        navigate.handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "feeling", "calm")).await.unwrap();
        navigate.handle(nav(&flow_id, Navigation::Next)).await.unwrap();

        let toggle = ToggleMultiSelectHandler::new(fx.flow_store.clone(), fx.scheduler.clone());
        let view = toggle
            .handle(ToggleMultiSelectCommand {
                flow_id: flow_id.clone(),
                step_id: "imagery".to_string(),
                value: "forest".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(view.current_step.id.as_str(), "imagery");
        assert!(!view.auto_advance_pending);

        let view = navigate.handle(nav(&flow_id, Navigation::Skip)).await.unwrap();
        assert_eq!(view.current_step.id.as_str(), "opening");
        assert!(matches!(
            navigate.handle(nav(&flow_id, Navigation::Skip)).await,
            Err(ApplicationError::BusinessRuleViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_and_close() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;
        fx.navigate().handle(nav(&flow_id, Navigation::Next)).await.unwrap();
        fx.select().handle(answer(&flow_id, "source", "plot_twist")).await.unwrap();

        let view = ResetFlowHandler::new(
            fx.flow_store.clone(),
            fx.scheduler.clone(),
            fx.releaser.clone(),
            fx.publisher.clone(),
        )
        .handle(ResetFlowCommand { flow_id: flow_id.clone() })
        .await
        .unwrap();
        assert_eq!(view.current_index, 0);
        assert!(view.answers.is_empty());
        assert_eq!(fx.scheduler.pending_count(), 0);

        let close = CloseFlowHandler::new(
            fx.flow_store.clone(),
            fx.scheduler.clone(),
            fx.releaser.clone(),
            fx.publisher.clone(),
        );
        close
            .handle(CloseFlowCommand {
                flow_id: flow_id.clone(),
                reason: "client_close".to_string(),
            })
            .await
            .unwrap();
        assert!(fx.flow_store.get(&flow_id).is_err());
        assert!(matches!(
            close
                .handle(CloseFlowCommand {
                    flow_id,
                    reason: "client_close".to_string(),
                })
                .await,
            Err(ApplicationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_interaction_rejected_while_submitting() {
        let fx = Fixture::new();
        let flow_id = fx.start().await;
        fx.flow_store
            .update(&flow_id, &mut |s: &mut FlowSession| s.submitting = true)
            .unwrap();

        let result = fx.navigate().handle(nav(&flow_id, Navigation::Next)).await;
        assert!(matches!(result, Err(ApplicationError::Busy(_))));
    }
}
