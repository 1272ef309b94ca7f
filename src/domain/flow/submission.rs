//! 提交 payload 组装

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{FlowError, FlowState};

/// 固定的上下文字段（目标环境 + 配置中的静态字段）
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    pub environment: String,
    pub fields: BTreeMap<String, String>,
}

impl SubmissionContext {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// 提交 payload：扁平 JSON 对象，step id -> answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubmissionPayload(Map<String, Value>);

impl SubmissionPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl FlowState {
    /// 组装提交 payload
    ///
    /// 包含全部已存回答（含被后续分支隐藏的步骤），键冲突时回答优先
    pub fn build_submission_payload(
        &self,
        context: &SubmissionContext,
    ) -> Result<SubmissionPayload, FlowError> {
        self.validate_complete()?;

        let mut map = Map::new();
        map.insert(
            "environment".to_string(),
            Value::String(context.environment.clone()),
        );
        for (key, value) in &context.fields {
            map.insert(key.clone(), Value::String(value.clone()));
        }

        for (step_id, answer) in self.answers() {
            let value = serde_json::to_value(answer).unwrap_or(Value::Null);
            if map.insert(step_id.to_string(), value).is_some() {
                tracing::warn!(step_id = %step_id, "Answer overrides context field with same name");
            }
        }

        Ok(SubmissionPayload(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{AnswerValue, StepCatalog};
    use std::sync::Arc;

    fn completed_flow() -> FlowState {
        let mut state = FlowState::new(Arc::new(StepCatalog::tap_in_default())).unwrap();
        state.go_next().unwrap();
        state.select_answer("source", AnswerValue::from("quick_shift")).unwrap();
        state.go_next().unwrap();
        state.select_answer("loop", AnswerValue::from("overthinking")).unwrap();
        state.go_next().unwrap();
        state.select_answer("feeling", AnswerValue::from("calm")).unwrap();
        state.go_next().unwrap();
        state
            .select_answer("imagery", AnswerValue::Many(vec!["beach".into(), "river".into()]))
            .unwrap();
        state.go_next().unwrap();
        state.select_answer("opening", AnswerValue::from("i-am")).unwrap();
        state.go_next().unwrap();
        state.select_answer("duration", AnswerValue::from("3")).unwrap();
        state.go_next().unwrap();
        state.skip().unwrap();
        state.select_answer("consent", AnswerValue::Flag(true)).unwrap();
        state
    }

    #[test]
    fn test_payload_contains_answers_and_context() {
        let state = completed_flow();
        let context = SubmissionContext::new("test").with_field("app", "tap-in");

        let payload = state.build_submission_payload(&context).unwrap();
        assert_eq!(payload.get("environment"), Some(&Value::from("test")));
        assert_eq!(payload.get("app"), Some(&Value::from("tap-in")));
        assert_eq!(payload.get("feeling"), Some(&Value::from("calm")));
        assert_eq!(payload.get("consent"), Some(&Value::Bool(true)));
        assert_eq!(
            payload.get("imagery"),
            Some(&serde_json::json!(["beach", "river"]))
        );
        assert!(payload.get("context").is_none());
    }

    #[test]
    fn test_switched_branch_must_be_completed() {
        let mut state = completed_flow();
        // 改走 Plot Twist 分支后 quest_response 尚未回答
        state.select_answer("source", AnswerValue::from("plot_twist")).unwrap();
        let err = state
            .build_submission_payload(&SubmissionContext::new("test"))
            .unwrap_err();
        assert_eq!(err, FlowError::Incomplete(crate::domain::flow::StepId::new("quest_response").unwrap()));
    }

    #[test]
    fn test_hidden_answers_included_after_branch_completed() {
        let mut state = completed_flow();
        state.select_answer("source", AnswerValue::from("plot_twist")).unwrap();
        // quest_response 在 source 之后、当前位置之前，已到达
        state.select_answer("quest_response", AnswerValue::from("tried")).unwrap();

        let payload = state
            .build_submission_payload(&SubmissionContext::new("production"))
            .unwrap();
        assert_eq!(payload.get("loop"), Some(&Value::from("overthinking")));
        assert_eq!(payload.get("quest_response"), Some(&Value::from("tried")));
    }

    #[test]
    fn test_incomplete_flow_rejected() {
        let state = FlowState::new(Arc::new(StepCatalog::tap_in_default())).unwrap();
        assert!(matches!(
            state.build_submission_payload(&SubmissionContext::default()),
            Err(FlowError::Incomplete(_))
        ));
    }
}
