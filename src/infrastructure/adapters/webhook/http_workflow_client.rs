//! HTTP Workflow Client - 调用外部生成工作流（webhook）
//!
//! 实现 WorkflowPort trait：
//! POST {submit_url}          Request: payload (JSON)   Response: JSON 数组
//! GET  {file_base_url}/{id}  Response: 原始音频字节
//!
//! 提交不可重试；音频拉取在网络错误、408、5xx 时按配置重试

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::application::ports::{
    AudioFetchError, FetchedAudio, SubmissionError, WorkflowItem, WorkflowPort,
};
use crate::domain::flow::SubmissionPayload;

/// HTTP Workflow 客户端配置
#[derive(Debug, Clone)]
pub struct HttpWorkflowClientConfig {
    /// 提交地址（已按环境选择）
    pub submit_url: String,
    /// 二进制文件基础地址
    pub file_base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 音频拉取的总尝试次数
    pub audio_fetch_retries: u32,
    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,
    /// 音频大小上限
    pub max_audio_bytes: usize,
}

impl Default for HttpWorkflowClientConfig {
    fn default() -> Self {
        Self {
            submit_url: "http://localhost:5678/webhook-test/tap-in".to_string(),
            file_base_url: "http://localhost:5678/file".to_string(),
            timeout_secs: 30,
            audio_fetch_retries: 3,
            retry_delay_ms: 1000,
            max_audio_bytes: 50 * 1024 * 1024,
        }
    }
}

impl HttpWorkflowClientConfig {
    pub fn new(submit_url: impl Into<String>, file_base_url: impl Into<String>) -> Self {
        Self {
            submit_url: submit_url.into(),
            file_base_url: file_base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32, delay_ms: u64) -> Self {
        self.audio_fetch_retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    pub fn with_max_audio_bytes(mut self, max: usize) -> Self {
        self.max_audio_bytes = max;
        self
    }
}

/// HTTP Workflow 客户端
pub struct HttpWorkflowClient {
    client: Client,
    config: HttpWorkflowClientConfig,
}

impl HttpWorkflowClient {
    pub fn new(config: HttpWorkflowClientConfig) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SubmissionError::NetworkError(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    fn with_client(client: Client, config: HttpWorkflowClientConfig) -> Self {
        Self { client, config }
    }

    /// 二进制音频地址
    fn file_url(&self, binary_id: &str) -> String {
        format!(
            "{}/{}",
            self.config.file_base_url.trim_end_matches('/'),
            binary_id
        )
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedAudio, AudioFetchError> {
        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AudioFetchError::Timeout
            } else {
                AudioFetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_fetch_status(status, url));
        }

        let max = self.config.max_audio_bytes;
        if let Some(len) = response.content_length() {
            if len as usize > max {
                return Err(AudioFetchError::TooLarge {
                    size: len as usize,
                    max,
                });
            }
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("audio/"));

        // 没有 Content-Length 时边读边计数，超限立即放弃
        let mut data = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AudioFetchError::NetworkError(format!("Failed to read audio: {}", e)))?
        {
            let size = data.len() + chunk.len();
            if size > max {
                return Err(AudioFetchError::TooLarge { size, max });
            }
            data.extend_from_slice(&chunk);
        }

        Ok(FetchedAudio { data, mime_type })
    }
}

/// 非 2xx 的音频响应分类：404 不存在，408/5xx 可重试，其余直接拒绝
fn classify_fetch_status(status: StatusCode, url: &str) -> AudioFetchError {
    if status == StatusCode::NOT_FOUND {
        AudioFetchError::NotFound(url.to_string())
    } else if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        AudioFetchError::ServiceError(format!("HTTP {}", status))
    } else {
        AudioFetchError::Rejected(status.as_u16())
    }
}

/// 提交失败的状态码分类
fn classify_submit_status(status: StatusCode, body: String) -> SubmissionError {
    match status {
        StatusCode::NOT_FOUND => SubmissionError::EndpointNotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SubmissionError::AccessDenied(status.as_u16())
        }
        _ => SubmissionError::ServiceError(format!("HTTP {}: {}", status, body)),
    }
}

/// 解析工作流响应；兼容直接返回单个对象的情况
fn parse_workflow_response(body: &[u8]) -> Result<Vec<WorkflowItem>, SubmissionError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Object(_) => serde_json::from_value(value).map(|item| vec![item]),
        other => {
            return Err(SubmissionError::InvalidResponse(format!(
                "Expected a JSON array, got {}",
                other
            )))
        }
    };
    items.map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl WorkflowPort for HttpWorkflowClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Vec<WorkflowItem>, SubmissionError> {
        tracing::debug!(
            url = %self.config.submit_url,
            fields = payload.len(),
            "Sending workflow submission"
        );

        let response = self
            .client
            .post(&self.config.submit_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::Timeout
                } else if e.is_connect() {
                    SubmissionError::NetworkError(format!("Cannot connect to workflow service: {}", e))
                } else {
                    SubmissionError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_submit_status(status, error_text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(format!("Failed to read body: {}", e)))?;
        let items = parse_workflow_response(&body)?;

        tracing::info!(items = items.len(), "Workflow submission completed");
        Ok(items)
    }

    async fn fetch_audio(&self, binary_id: &str) -> Result<FetchedAudio, AudioFetchError> {
        let url = self.file_url(binary_id);
        let attempts = self.config.audio_fetch_retries.max(1);
        let delay = Duration::from_millis(self.config.retry_delay_ms);

        let mut attempt = 1;
        loop {
            match self.fetch_once(&url).await {
                Ok(audio) => {
                    tracing::debug!(
                        url = %url,
                        attempt = attempt,
                        size = audio.data.len(),
                        "Audio fetched"
                    );
                    return Ok(audio);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        url = %url,
                        attempt = attempt,
                        error = %e,
                        "Audio fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
