//! Flow Commands - 表单相关命令

use serde::Serialize;

use crate::application::ports::{FlowSession, WorkflowItem};
use crate::domain::flow::{AnswerSet, AnswerValue, StepDefinition};

/// 开始新表单
#[derive(Debug, Clone, Default)]
pub struct StartFlowCommand;

/// 记录回答命令（单选 / 自由文本 / 勾选框 / 多选整体替换）
#[derive(Debug, Clone)]
pub struct SelectAnswerCommand {
    pub flow_id: String,
    pub step_id: String,
    pub value: AnswerValue,
}

/// 多选切换命令
#[derive(Debug, Clone)]
pub struct ToggleMultiSelectCommand {
    pub flow_id: String,
    pub step_id: String,
    pub value: String,
}

/// 导航方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    Skip,
}

/// 导航命令
#[derive(Debug, Clone)]
pub struct NavigateCommand {
    pub flow_id: String,
    pub navigation: Navigation,
}

/// 重新开始命令（"Create Another"）
#[derive(Debug, Clone)]
pub struct ResetFlowCommand {
    pub flow_id: String,
}

/// 提交命令
#[derive(Debug, Clone)]
pub struct SubmitFlowCommand {
    pub flow_id: String,
}

/// 提交响应
#[derive(Debug, Clone, Serialize)]
pub struct SubmitFlowResponse {
    pub flow: FlowView,
    pub playback: Option<super::PlaybackView>,
}

/// 关闭表单命令
#[derive(Debug, Clone)]
pub struct CloseFlowCommand {
    pub flow_id: String,
    pub reason: String,
}

/// 关闭表单响应
#[derive(Debug, Clone, Serialize)]
pub struct CloseFlowResponse {
    pub flow_id: String,
    pub released_playback: bool,
}

/// 表单视图
#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub flow_id: String,
    pub current_index: usize,
    pub current_step: StepDefinition,
    pub visible_steps: Vec<StepDefinition>,
    pub answers: AnswerSet,
    pub can_advance: bool,
    pub is_last_step: bool,
    pub auto_advance_pending: bool,
    pub submitting: bool,
    pub response: Option<WorkflowItem>,
    pub playback_id: Option<String>,
}

impl FlowView {
    pub fn from_session(session: &FlowSession) -> Self {
        let state = &session.state;
        Self {
            flow_id: session.id.clone(),
            current_index: state.current_index(),
            current_step: state.current_step().clone(),
            visible_steps: state.visible_steps().into_iter().cloned().collect(),
            answers: state.answers().clone(),
            can_advance: state.can_advance(),
            is_last_step: state.is_last_step(),
            auto_advance_pending: state.pending_advance().is_some(),
            submitting: session.submitting,
            response: session.response.clone(),
            playback_id: session.playback_id.map(|id| id.to_string()),
        }
    }
}
