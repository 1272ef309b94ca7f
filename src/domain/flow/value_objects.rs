//! Flow Context - Value Objects

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// 步骤唯一标识（同时作为提交 payload 中的字段名）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("步骤 ID 不能为空");
        }
        if id.len() > 64 {
            return Err("步骤 ID 长度不能超过64字符");
        }
        Ok(Self(id))
    }

    /// 内置常量 ID，跳过校验
    pub(crate) fn from_static(id: &'static str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 步骤类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// 单选
    SingleSelect,
    /// 多选
    MultiSelect,
    /// 自由文本
    FreeText,
    /// 单个勾选框
    SingleCheckbox,
    /// 说明页（无需回答）
    Informational,
}

impl StepKind {
    /// 是否需要 options
    pub fn has_options(&self) -> bool {
        matches!(self, StepKind::SingleSelect | StepKind::MultiSelect)
    }

    /// 选中后是否自动前进
    pub fn auto_advances(&self) -> bool {
        matches!(self, StepKind::SingleSelect | StepKind::SingleCheckbox)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::SingleSelect => "single_select",
            StepKind::MultiSelect => "multi_select",
            StepKind::FreeText => "free_text",
            StepKind::SingleCheckbox => "single_checkbox",
            StepKind::Informational => "informational",
        }
    }
}

/// 选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOption {
    pub value: String,
    pub label: String,
}

impl StepOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// 回答值
///
/// 单选 / 自由文本为字符串，勾选框为布尔值，多选为有序且不重复的值列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Text(String),
    Many(Vec<String>),
}

impl AnswerValue {
    /// 是否为“有效回答”：非空字符串、非空集合、或任意布尔值
    pub fn is_present(&self) -> bool {
        match self {
            AnswerValue::Flag(_) => true,
            AnswerValue::Text(s) => !s.trim().is_empty(),
            AnswerValue::Many(values) => !values.is_empty(),
        }
    }

    /// 与条件值比较；多选时判断是否包含
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            AnswerValue::Flag(b) => b.to_string() == expected,
            AnswerValue::Text(s) => s == expected,
            AnswerValue::Many(values) => values.iter().any(|v| v == expected),
        }
    }

    /// 该值形状是否适用于指定步骤类型
    pub fn fits(&self, kind: StepKind) -> bool {
        matches!(
            (kind, self),
            (StepKind::SingleSelect, AnswerValue::Text(_))
                | (StepKind::FreeText, AnswerValue::Text(_))
                | (StepKind::SingleCheckbox, AnswerValue::Flag(_))
                | (StepKind::MultiSelect, AnswerValue::Many(_))
        )
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Flag(value)
    }
}

/// 步骤可见性条件
///
/// 以数据而非闭包表达，便于从 TOML 加载与测试
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Always,
    EqualsAnswer { step: StepId, value: String },
    AnswerIsOneOf { step: StepId, values: Vec<String> },
}

impl Visibility {
    /// 条件所引用的步骤
    pub fn depends_on(&self) -> Option<&StepId> {
        match self {
            Visibility::Always => None,
            Visibility::EqualsAnswer { step, .. } | Visibility::AnswerIsOneOf { step, .. } => {
                Some(step)
            }
        }
    }

    /// 基于当前回答求值；被引用步骤未回答时视为不可见
    pub fn evaluate(&self, answers: &super::AnswerSet) -> bool {
        match self {
            Visibility::Always => true,
            Visibility::EqualsAnswer { step, value } => answers
                .get(step.as_str())
                .map(|answer| answer.matches(value))
                .unwrap_or(false),
            Visibility::AnswerIsOneOf { step, values } => answers
                .get(step.as_str())
                .map(|answer| values.iter().any(|v| answer.matches(v)))
                .unwrap_or(false),
        }
    }
}
