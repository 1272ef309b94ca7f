//! Session Reaper - 空闲会话回收
//!
//! 浏览器直接关闭时不会调用 close / release，由此定期关闭空闲表单并回收其音频句柄

use std::sync::Arc;
use std::time::Duration;

use crate::application::{
    CloseFlowCommand, CloseFlowHandler, FlowSession, PlaybackEntry, ReleasePlaybackHandler,
    SessionStorePort,
};

/// Reaper 配置
#[derive(Debug, Clone)]
pub struct SessionReaperConfig {
    /// 扫描间隔
    pub interval: Duration,
    /// 空闲超时（秒）
    pub session_expire_secs: u64,
}

impl Default for SessionReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            session_expire_secs: 3600,
        }
    }
}

/// 一次扫描的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub flows_closed: usize,
    pub playbacks_released: usize,
}

/// 空闲会话回收器
pub struct SessionReaper {
    config: SessionReaperConfig,
    flow_store: Arc<dyn SessionStorePort<FlowSession>>,
    playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
    close_flow_handler: Arc<CloseFlowHandler>,
    release_playback_handler: Arc<ReleasePlaybackHandler>,
}

impl SessionReaper {
    pub fn new(
        config: SessionReaperConfig,
        flow_store: Arc<dyn SessionStorePort<FlowSession>>,
        playback_store: Arc<dyn SessionStorePort<PlaybackEntry>>,
        close_flow_handler: Arc<CloseFlowHandler>,
        release_playback_handler: Arc<ReleasePlaybackHandler>,
    ) -> Self {
        Self {
            config,
            flow_store,
            playback_store,
            close_flow_handler,
            release_playback_handler,
        }
    }

    /// 启动回收循环
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            session_expire_secs = self.config.session_expire_secs,
            "SessionReaper started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        // 第一次 tick 立即返回
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            if report != SweepReport::default() {
                tracing::info!(
                    flows_closed = report.flows_closed,
                    playbacks_released = report.playbacks_released,
                    "Idle sessions reaped"
                );
            }
        }
    }

    /// 执行一次扫描
    pub async fn sweep(&self) -> SweepReport {
        let expire = self.config.session_expire_secs;
        let expired_playbacks = self.playback_store.get_expired_sessions(expire);
        let mut report = SweepReport::default();

        for flow_id in self.flow_store.get_expired_sessions(expire) {
            let Ok(flow) = self.flow_store.get(&flow_id) else {
                continue;
            };
            if flow.submitting {
                continue;
            }
            // 仍在收听的表单不回收
            let listening = flow
                .playback_id
                .map(|id| {
                    let id = id.to_string();
                    self.playback_store.get(&id).is_ok() && !expired_playbacks.contains(&id)
                })
                .unwrap_or(false);
            if listening {
                continue;
            }

            let cmd = CloseFlowCommand {
                flow_id: flow_id.clone(),
                reason: "expired".to_string(),
            };
            match self.close_flow_handler.handle(cmd).await {
                Ok(result) => {
                    report.flows_closed += 1;
                    if result.released_playback {
                        report.playbacks_released += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(flow_id = %flow_id, error = %e, "Failed to close idle flow");
                }
            }
        }

        // 表单已不存在的孤立播放会话
        for playback_id in expired_playbacks {
            let Ok(entry) = self.playback_store.get(&playback_id) else {
                continue;
            };
            if self.flow_store.get(&entry.flow_id).is_ok() {
                continue;
            }
            if self.release_playback_handler.release(&playback_id) {
                report.playbacks_released += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AutoAdvancePort;
    use crate::domain::flow::{AdvanceTicket, FlowState, StepCatalog};
    use crate::domain::playback::PlaybackSession;
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::{InMemoryAudioStore, InMemorySessionStore};
    use chrono::Utc;

    /// 测试用：不调度任何任务
    struct NoopAutoAdvance;

    impl AutoAdvancePort for NoopAutoAdvance {
        fn schedule(&self, _flow_id: &str, _ticket: AdvanceTicket, _delay: Duration) {}

        fn cancel(&self, _flow_id: &str) -> bool {
            false
        }

        fn pending_count(&self) -> usize {
            0
        }
    }

    struct Fixture {
        flow_store: Arc<InMemorySessionStore<FlowSession>>,
        playback_store: Arc<InMemorySessionStore<PlaybackEntry>>,
        reaper: SessionReaper,
    }

    fn fixture() -> Fixture {
        let flow_store: Arc<InMemorySessionStore<FlowSession>> = InMemorySessionStore::new().arc();
        let playback_store: Arc<InMemorySessionStore<PlaybackEntry>> =
            InMemorySessionStore::new().arc();
        let publisher = EventPublisher::new().arc();
        let releaser = Arc::new(ReleasePlaybackHandler::new(
            playback_store.clone(),
            flow_store.clone(),
            InMemoryAudioStore::new(1024).arc(),
            publisher.clone(),
        ));
        let closer = Arc::new(CloseFlowHandler::new(
            flow_store.clone(),
            Arc::new(NoopAutoAdvance),
            releaser.clone(),
            publisher,
        ));
        let reaper = SessionReaper::new(
            SessionReaperConfig {
                interval: Duration::from_secs(60),
                session_expire_secs: 60,
            },
            flow_store.clone(),
            playback_store.clone(),
            closer,
            releaser,
        );
        Fixture {
            flow_store,
            playback_store,
            reaper,
        }
    }

    fn insert_flow(fx: &Fixture, idle_secs: i64, with_playback: Option<i64>) -> (String, Option<String>) {
        let state = FlowState::new(Arc::new(StepCatalog::tap_in_default())).unwrap();
        let mut flow = FlowSession::new(state);
        flow.last_activity = Utc::now() - chrono::Duration::seconds(idle_secs);

        let playback_id = with_playback.map(|playback_idle| {
            let session = PlaybackSession::new("Breathe in. Breathe out.", None);
            flow.playback_id = Some(session.id());
            let mut entry = PlaybackEntry::new(flow.id.clone(), session);
            entry.last_activity = Utc::now() - chrono::Duration::seconds(playback_idle);
            fx.playback_store.create(entry).unwrap()
        });

        let flow_id = fx.flow_store.create(flow).unwrap();
        (flow_id, playback_id)
    }

    #[tokio::test]
    async fn test_idle_flow_closed_with_playback() {
        let fx = fixture();
        let (idle, idle_playback) = insert_flow(&fx, 600, Some(600));
        let (fresh, _) = insert_flow(&fx, 0, None);

        let report = fx.reaper.sweep().await;
        assert_eq!(
            report,
            SweepReport {
                flows_closed: 1,
                playbacks_released: 1
            }
        );
        assert!(fx.flow_store.get(&idle).is_err());
        assert!(fx.playback_store.get(&idle_playback.unwrap()).is_err());
        assert!(fx.flow_store.get(&fresh).is_ok());
    }

    #[tokio::test]
    async fn test_listening_flow_kept() {
        let fx = fixture();
        // 表单空闲，但播放仍有上报
        let (flow_id, playback_id) = insert_flow(&fx, 600, Some(0));

        let report = fx.reaper.sweep().await;
        assert_eq!(report, SweepReport::default());
        assert!(fx.flow_store.get(&flow_id).is_ok());
        assert!(fx.playback_store.get(&playback_id.unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_orphan_playback_released() {
        let fx = fixture();
        let mut entry = PlaybackEntry::new("gone", PlaybackSession::new("Hello.", None));
        entry.last_activity = Utc::now() - chrono::Duration::seconds(600);
        let playback_id = fx.playback_store.create(entry).unwrap();

        let report = fx.reaper.sweep().await;
        assert_eq!(report.playbacks_released, 1);
        assert!(fx.playback_store.get(&playback_id).is_err());
    }
}
