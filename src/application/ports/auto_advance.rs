//! Auto Advance Port - 延迟自动前进调度
//!
//! 每个表单最多一个挂起任务；新的调度会取代旧任务

use std::time::Duration;

use crate::domain::flow::AdvanceTicket;

/// Auto Advance Port
pub trait AutoAdvancePort: Send + Sync {
    /// 在 delay 之后尝试以 ticket 前进一步
    fn schedule(&self, flow_id: &str, ticket: AdvanceTicket, delay: Duration);

    /// 取消挂起任务，返回是否存在挂起任务
    fn cancel(&self, flow_id: &str) -> bool;

    /// 当前挂起任务数
    fn pending_count(&self) -> usize;
}
