//! Workflow Port - 外部生成工作流抽象
//!
//! 提交表单 payload、拉取生成的二进制音频；具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::flow::SubmissionPayload;

/// 提交错误
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("API endpoint not found")]
    EndpointNotFound,

    #[error("Access denied (HTTP {0})")]
    AccessDenied(u16),

    #[error("Unable to connect to the workflow service: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 音频拉取错误
#[derive(Debug, Error)]
pub enum AudioFetchError {
    #[error("Audio not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Audio request rejected (HTTP {0})")]
    Rejected(u16),

    #[error("Audio too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

impl AudioFetchError {
    /// 是否值得重试（网络错误、超时、5xx/408）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AudioFetchError::NetworkError(_)
                | AudioFetchError::Timeout
                | AudioFetchError::ServiceError(_)
        )
    }
}

/// 生成工具的元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    /// 标称时长（秒），仅用于展示；无法识别的值按缺省处理
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 其余字段原样保留
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 接受数字或数字字符串；其余值（含负数、非有限值）视为缺省
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let seconds = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(seconds.filter(|s| s.is_finite() && *s >= 0.0))
}

/// 生成的文本工具（affirmation / meditation）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    pub tool_text: String,
    #[serde(default)]
    pub metadata: ToolMetadata,
}

/// 工作流响应数组中的一项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affirmation: Option<GeneratedTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meditation: Option<GeneratedTool>,
    /// 二进制音频的不透明引用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    /// 原样透传（可能是 "1.51 MB" 或字节数）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<serde_json::Value>,
    /// 直接可播放的地址
    #[serde(default, alias = "audio_url", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// 音频描述：从响应中解析出的播放来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioDescriptor {
    /// 直接可播放的地址
    Direct { url: String },
    /// 需要单独拉取的二进制引用
    Binary {
        binary_id: String,
        mime_type: Option<String>,
    },
    None,
}

impl WorkflowItem {
    /// 解析音频来源
    ///
    /// 直接地址优先；否则有 id 且 fileType 缺省或为 "audio" 时视为可拉取
    pub fn audio_descriptor(&self) -> AudioDescriptor {
        if let Some(url) = self.audio_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return AudioDescriptor::Direct {
                url: url.to_string(),
            };
        }

        let is_audio = self
            .file_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("audio"))
            .unwrap_or(true);

        match self.id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) if is_audio => AudioDescriptor::Binary {
                binary_id: id.to_string(),
                mime_type: self.mime_type.clone(),
            },
            _ => AudioDescriptor::None,
        }
    }
}

/// 拉取到的音频
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Workflow Port
///
/// 外部生成服务的抽象接口
#[async_trait]
pub trait WorkflowPort: Send + Sync {
    /// 提交 payload，返回响应数组（不重试）
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Vec<WorkflowItem>, SubmissionError>;

    /// 按二进制引用拉取音频（幂等，可重试）
    async fn fetch_audio(&self, binary_id: &str) -> Result<FetchedAudio, AudioFetchError>;
}
