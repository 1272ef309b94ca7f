//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{AudioStoreError, SessionError, SubmissionError};
use crate::domain::flow::FlowError;
use crate::domain::playback::PlaybackError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 业务规则违反
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 操作进行中（如重复提交）
    #[error("Busy: {0}")]
    Busy(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建业务规则违反错误
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建忙碌错误
    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<FlowError> for ApplicationError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::UnknownStep(_)
            | FlowError::StepNotReached(_)
            | FlowError::InvalidAnswer(_)
            | FlowError::UnknownOption { .. } => Self::ValidationError(err.to_string()),
            FlowError::AnswerRequired(_) | FlowError::NotSkippable(_) | FlowError::Incomplete(_) => {
                Self::BusinessRuleViolation(err.to_string())
            }
            FlowError::NoVisibleSteps => Self::InvalidState(err.to_string()),
        }
    }
}

impl From<PlaybackError> for ApplicationError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::InvalidPosition(_) | PlaybackError::InvalidDuration(_) => {
                Self::ValidationError(err.to_string())
            }
            PlaybackError::Released | PlaybackError::NoAudio | PlaybackError::DurationUnknown => {
                Self::InvalidState(err.to_string())
            }
        }
    }
}

impl From<SubmissionError> for ApplicationError {
    fn from(err: SubmissionError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<AudioStoreError> for ApplicationError {
    fn from(err: AudioStoreError) -> Self {
        match err {
            AudioStoreError::NotFound(handle) => Self::not_found("Audio", handle),
            _ => Self::InternalError(err.to_string()),
        }
    }
}

impl ApplicationError {
    /// 会话查找失败时转换为 NotFound
    pub fn from_session(resource_type: &'static str, err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::not_found(resource_type, id),
            SessionError::AlreadyExists(id) => {
                Self::InternalError(format!("{} already exists: {}", resource_type, id))
            }
        }
    }
}
