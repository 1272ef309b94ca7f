//! Flow Context - Entities

use serde::{Deserialize, Serialize};

use super::{AnswerSet, StepId, StepKind, StepOption, Visibility};

/// 步骤定义（静态、不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<StepOption>,
    #[serde(default)]
    pub skippable: bool,
    #[serde(default)]
    pub visible_when: Visibility,
}

impl StepDefinition {
    pub fn new(id: StepId, title: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            kind,
            options: Vec::new(),
            skippable: false,
            visible_when: Visibility::Always,
        }
    }

    pub fn with_options(mut self, options: Vec<StepOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn skippable(mut self) -> Self {
        self.skippable = true;
        self
    }

    pub fn visible_when(mut self, visibility: Visibility) -> Self {
        self.visible_when = visibility;
        self
    }

    pub fn is_visible(&self, answers: &AnswerSet) -> bool {
        self.visible_when.evaluate(answers)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// 是否允许离开该步骤
    ///
    /// 说明页、可跳过步骤、或已有有效回答时为 true
    pub fn can_advance(&self, answers: &AnswerSet) -> bool {
        if self.kind == StepKind::Informational || self.skippable {
            return true;
        }
        answers
            .get(self.id.as_str())
            .map(|answer| answer.is_present())
            .unwrap_or(false)
    }
}
