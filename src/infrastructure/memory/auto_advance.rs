//! Tokio Auto Advance Scheduler
//!
//! 每个表单一个延迟任务，新调度取代旧任务（旧任务被 abort）

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::application::commands::handlers::ApplyAutoAdvanceHandler;
use crate::application::ports::AutoAdvancePort;
use crate::domain::flow::AdvanceTicket;

/// 基于 tokio 定时器的自动前进调度器
pub struct TokioAutoAdvanceScheduler {
    /// flow_id -> (ticket, 挂起任务)
    pending: Arc<DashMap<String, (AdvanceTicket, AbortHandle)>>,
    applier: Arc<ApplyAutoAdvanceHandler>,
}

impl TokioAutoAdvanceScheduler {
    pub fn new(applier: Arc<ApplyAutoAdvanceHandler>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            applier,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl AutoAdvancePort for TokioAutoAdvanceScheduler {
    fn schedule(&self, flow_id: &str, ticket: AdvanceTicket, delay: Duration) {
        let pending = self.pending.clone();
        let applier = self.applier.clone();
        let key = flow_id.to_string();
        // 票据登记到 pending 之后任务才开始计时
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            if registered_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            // 只有仍是当前票据时才执行
            let fired = pending
                .remove_if(&key, |_, (current, _)| *current == ticket)
                .is_some();
            if fired {
                applier.handle(&key, ticket);
            }
        });

        if let Some((previous, handle)) = self
            .pending
            .insert(flow_id.to_string(), (ticket, task.abort_handle()))
        {
            handle.abort();
            tracing::debug!(
                flow_id = %flow_id,
                superseded = previous.value(),
                "Pending auto advance superseded"
            );
        }
        let _ = registered_tx.send(());
        tracing::debug!(
            flow_id = %flow_id,
            ticket = ticket.value(),
            delay_ms = delay.as_millis() as u64,
            "Auto advance scheduled"
        );
    }

    fn cancel(&self, flow_id: &str) -> bool {
        match self.pending.remove(flow_id) {
            Some((_, (ticket, handle))) => {
                handle.abort();
                tracing::debug!(flow_id = %flow_id, ticket = ticket.value(), "Auto advance cancelled");
                true
            }
            None => false,
        }
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
