//! Flow Context - Aggregate Root

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::{AnswerValue, FlowError, StepCatalog, StepDefinition, StepId, StepKind};

/// 回答集合：step id -> answer
pub type AnswerSet = BTreeMap<StepId, AnswerValue>;

/// 自动前进票据
///
/// 每次调度生成新票据；只有与当前挂起票据一致时才会生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AdvanceTicket(u64);

impl AdvanceTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct PendingAdvance {
    ticket: AdvanceTicket,
    from_step: StepId,
}

/// FlowState 聚合根
///
/// 不变量:
/// - visible 始终按目录顺序排列且非空（首个步骤不可能带条件）
/// - 0 <= current_index < visible.len()
/// - 最多只有一个挂起的自动前进
#[derive(Debug, Clone)]
pub struct FlowState {
    catalog: Arc<StepCatalog>,
    answers: AnswerSet,
    /// 可见步骤在目录中的下标
    visible: Vec<usize>,
    current_index: usize,
    pending_advance: Option<PendingAdvance>,
    next_ticket: u64,
}

impl FlowState {
    pub fn new(catalog: Arc<StepCatalog>) -> Result<Self, FlowError> {
        let answers = AnswerSet::new();
        let visible = catalog.visible_positions(&answers);
        if visible.is_empty() {
            return Err(FlowError::NoVisibleSteps);
        }
        Ok(Self {
            catalog,
            answers,
            visible,
            current_index: 0,
            pending_advance: None,
            next_ticket: 1,
        })
    }

    // Getters
    pub fn catalog(&self) -> &Arc<StepCatalog> {
        &self.catalog
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn visible_steps(&self) -> Vec<&StepDefinition> {
        self.visible
            .iter()
            .map(|&pos| &self.catalog.steps()[pos])
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.catalog.steps()[self.visible[self.current_index]]
    }

    pub fn is_last_step(&self) -> bool {
        self.current_index + 1 >= self.visible.len()
    }

    pub fn pending_advance(&self) -> Option<AdvanceTicket> {
        self.pending_advance.as_ref().map(|p| p.ticket)
    }

    /// 当前步骤是否允许前进
    pub fn can_advance(&self) -> bool {
        self.current_step().can_advance(&self.answers)
    }

    /// 记录回答
    ///
    /// 单选/勾选框且回答的是当前步骤、不在最后一步时返回自动前进票据，
    /// 调用方负责在延迟后调用 `apply_auto_advance`
    pub fn select_answer(
        &mut self,
        step_id: &str,
        value: AnswerValue,
    ) -> Result<Option<AdvanceTicket>, FlowError> {
        let step = self.reached_step(step_id)?.clone();
        let value = Self::validate_answer(&step, value)?;

        self.cancel_pending();
        match value {
            AnswerValue::Many(ref values) if values.is_empty() => {
                self.answers.remove(step_id);
            }
            _ => {
                self.answers.insert(step.id.clone(), value);
            }
        }
        self.recompute_visible();

        if step.kind.auto_advances() && self.current_step().id == step.id && !self.is_last_step() {
            return Ok(Some(self.schedule_advance(step.id)));
        }
        Ok(None)
    }

    /// 多选切换：不存在则加入，存在则移除；不会自动前进
    pub fn toggle_multi_select(&mut self, step_id: &str, value: &str) -> Result<(), FlowError> {
        let step = self.reached_step(step_id)?.clone();
        if step.kind != StepKind::MultiSelect {
            return Err(FlowError::InvalidAnswer(step.id));
        }
        if !step.has_option(value) {
            return Err(FlowError::UnknownOption {
                step: step.id,
                value: value.to_string(),
            });
        }

        self.cancel_pending();
        let mut values = match self.answers.remove(step_id) {
            Some(AnswerValue::Many(values)) => values,
            _ => Vec::new(),
        };
        if let Some(pos) = values.iter().position(|v| v == value) {
            values.remove(pos);
        } else {
            values.push(value.to_string());
        }
        if !values.is_empty() {
            self.answers.insert(step.id, AnswerValue::Many(values));
        }
        self.recompute_visible();
        Ok(())
    }

    /// 执行到期的自动前进；票据已被取代时返回 false
    pub fn apply_auto_advance(&mut self, ticket: AdvanceTicket) -> bool {
        let pending = match self.pending_advance.take() {
            Some(p) if p.ticket == ticket => p,
            other => {
                self.pending_advance = other;
                return false;
            }
        };

        if self.current_step().id != pending.from_step || self.is_last_step() || !self.can_advance()
        {
            return false;
        }
        self.current_index += 1;
        true
    }

    /// 前进一步；当前步骤不满足 can_advance 时拒绝
    pub fn go_next(&mut self) -> Result<usize, FlowError> {
        self.cancel_pending();
        if !self.can_advance() {
            return Err(FlowError::AnswerRequired(self.current_step().id.clone()));
        }
        self.step_forward();
        Ok(self.current_index)
    }

    /// 后退一步（在第一步时保持不动）
    pub fn go_previous(&mut self) -> usize {
        self.cancel_pending();
        self.current_index = self.current_index.saturating_sub(1);
        self.current_index
    }

    /// 跳过当前步骤；仅 skippable 步骤允许
    pub fn skip(&mut self) -> Result<usize, FlowError> {
        self.cancel_pending();
        let step = self.current_step();
        if !step.skippable {
            return Err(FlowError::NotSkippable(step.id.clone()));
        }
        self.step_forward();
        Ok(self.current_index)
    }

    /// 取消挂起的自动前进
    pub fn cancel_pending(&mut self) -> Option<AdvanceTicket> {
        self.pending_advance.take().map(|p| p.ticket)
    }

    /// 重新开始（"Create Another"）
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.answers.clear();
        self.current_index = 0;
        self.recompute_visible();
    }

    /// 所有可见步骤都满足 can_advance 时才允许提交
    pub fn validate_complete(&self) -> Result<(), FlowError> {
        for step in self.visible_steps() {
            if !step.can_advance(&self.answers) {
                return Err(FlowError::Incomplete(step.id.clone()));
            }
        }
        Ok(())
    }

    fn step_forward(&mut self) {
        self.current_index = (self.current_index + 1).min(self.visible.len() - 1);
    }

    fn schedule_advance(&mut self, from_step: StepId) -> AdvanceTicket {
        let ticket = AdvanceTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending_advance = Some(PendingAdvance { ticket, from_step });
        ticket
    }

    /// 已到达（可见且不在当前位置之后）的步骤
    fn reached_step(&self, step_id: &str) -> Result<&StepDefinition, FlowError> {
        let pos = self
            .catalog
            .steps()
            .iter()
            .position(|s| s.id.as_str() == step_id)
            .ok_or_else(|| FlowError::UnknownStep(step_id.to_string()))?;
        let step = &self.catalog.steps()[pos];

        match self.visible.iter().position(|&p| p == pos) {
            Some(index) if index <= self.current_index => Ok(step),
            _ => Err(FlowError::StepNotReached(step.id.clone())),
        }
    }

    fn validate_answer(step: &StepDefinition, value: AnswerValue) -> Result<AnswerValue, FlowError> {
        if step.kind == StepKind::Informational || !value.fits(step.kind) {
            return Err(FlowError::InvalidAnswer(step.id.clone()));
        }

        match value {
            AnswerValue::Text(choice) if step.kind == StepKind::SingleSelect => {
                if !step.has_option(&choice) {
                    return Err(FlowError::UnknownOption {
                        step: step.id.clone(),
                        value: choice,
                    });
                }
                Ok(AnswerValue::Text(choice))
            }
            AnswerValue::Many(values) => {
                let mut unique: Vec<String> = Vec::with_capacity(values.len());
                for value in values {
                    if !step.has_option(&value) {
                        return Err(FlowError::UnknownOption {
                            step: step.id.clone(),
                            value,
                        });
                    }
                    if !unique.contains(&value) {
                        unique.push(value);
                    }
                }
                Ok(AnswerValue::Many(unique))
            }
            other => Ok(other),
        }
    }

    /// 回答变化后重新计算可见步骤
    ///
    /// 当前步骤仍可见时跟随该步骤；否则夹到新的最后一个有效位置
    fn recompute_visible(&mut self) {
        let current_pos = self.visible.get(self.current_index).copied();
        self.visible = self.catalog.visible_positions(&self.answers);

        if let Some(pos) = current_pos {
            if let Some(index) = self.visible.iter().position(|&p| p == pos) {
                self.current_index = index;
                return;
            }
        }
        self.current_index = self.current_index.min(self.visible.len().saturating_sub(1));
    }
}
