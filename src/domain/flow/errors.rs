//! Flow Context - Errors

use thiserror::Error;

use super::StepId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("步骤不存在: {0}")]
    UnknownStep(String),

    #[error("步骤当前不可回答: {0}")]
    StepNotReached(StepId),

    #[error("回答格式与步骤类型不符: {0}")]
    InvalidAnswer(StepId),

    #[error("选项不存在: {step} = {value}")]
    UnknownOption { step: StepId, value: String },

    #[error("当前步骤需要回答后才能继续: {0}")]
    AnswerRequired(StepId),

    #[error("当前步骤不可跳过: {0}")]
    NotSkippable(StepId),

    #[error("表单尚未完成: {0}")]
    Incomplete(StepId),

    #[error("没有可见步骤")]
    NoVisibleSteps,
}

/// 步骤目录加载/校验错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("步骤目录为空")]
    Empty,

    #[error("重复的步骤 ID: {0}")]
    DuplicateStep(StepId),

    #[error("无效的步骤 ID: {0}")]
    InvalidStepId(String),

    #[error("选择类步骤缺少选项: {0}")]
    MissingOptions(StepId),

    #[error("可见性条件引用了未定义或靠后的步骤: {step} -> {depends_on}")]
    ForwardReference { step: StepId, depends_on: StepId },

    #[error("文件读取错误: {0}")]
    FileReadError(String),

    #[error("目录解析错误: {0}")]
    ParseError(String),
}
