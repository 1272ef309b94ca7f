//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 生成工作流配置
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// 表单配置
    #[serde(default)]
    pub flow: FlowConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// GC 配置
    #[serde(default)]
    pub gc: GcConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,

    /// 静态文件服务配置
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// 静态文件服务配置（单页应用）
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 工作流目标环境
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEnvironment {
    #[default]
    Test,
    Production,
}

impl WebhookEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEnvironment::Test => "test",
            WebhookEnvironment::Production => "production",
        }
    }
}

/// 生成工作流配置
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// 目标环境，决定提交地址
    #[serde(default)]
    pub environment: WebhookEnvironment,

    #[serde(default = "default_test_url")]
    pub test_url: String,

    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// 二进制音频基础地址：GET {file_base_url}/{id}
    #[serde(default = "default_file_base_url")]
    pub file_base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// 音频拉取总尝试次数
    #[serde(default = "default_audio_fetch_retries")]
    pub audio_fetch_retries: u32,

    /// 重试间隔（毫秒）
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// 演示模式：使用内置示例响应，不访问网络
    #[serde(default)]
    pub demo: bool,

    /// 附加到每次提交的固定字段
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

fn default_test_url() -> String {
    "https://dev-blc.app.n8n.cloud/webhook-test/tap-in".to_string()
}

fn default_production_url() -> String {
    "https://dev-blc.app.n8n.cloud/webhook/tap-in".to_string()
}

fn default_file_base_url() -> String {
    "https://dev-blc.app.n8n.cloud/file".to_string()
}

fn default_webhook_timeout() -> u64 {
    30
}

fn default_audio_fetch_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            environment: WebhookEnvironment::default(),
            test_url: default_test_url(),
            production_url: default_production_url(),
            file_base_url: default_file_base_url(),
            timeout_secs: default_webhook_timeout(),
            audio_fetch_retries: default_audio_fetch_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            demo: false,
            context: BTreeMap::new(),
        }
    }
}

impl WebhookConfig {
    /// 按环境选择提交地址
    pub fn submit_url(&self) -> &str {
        match self.environment {
            WebhookEnvironment::Test => &self.test_url,
            WebhookEnvironment::Production => &self.production_url,
        }
    }
}

/// 表单配置
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// 单选 / 勾选后自动前进的延迟（毫秒）
    #[serde(default = "default_auto_advance_delay_ms")]
    pub auto_advance_delay_ms: u64,

    /// 自定义步骤目录（TOML）；未设置时使用内置目录
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_auto_advance_delay_ms() -> u64 {
    300
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: default_auto_advance_delay_ms(),
            catalog_path: None,
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 单个音频的大小上限（字节）
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
}

fn default_max_audio_bytes() -> usize {
    50 * 1024 * 1024 // 50 MiB
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

/// GC（空闲会话回收）配置
#[derive(Debug, Clone, Deserialize)]
pub struct GcConfig {
    /// 是否启用自动 GC
    #[serde(default = "default_gc_enabled")]
    pub enabled: bool,

    /// GC 间隔时间（秒）
    #[serde(default = "default_gc_interval")]
    pub interval_secs: u64,

    /// 会话空闲过期时间（秒）
    #[serde(default = "default_session_expire")]
    pub session_expire_secs: u64,
}

fn default_gc_enabled() -> bool {
    true
}

fn default_gc_interval() -> u64 {
    60
}

fn default_session_expire() -> u64 {
    3600 // 1 小时
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: default_gc_enabled(),
            interval_secs: default_gc_interval(),
            session_expire_secs: default_session_expire(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.webhook.environment, WebhookEnvironment::Test);
        assert_eq!(config.flow.auto_advance_delay_ms, 300);
        assert_eq!(config.playback.max_audio_bytes, 50 * 1024 * 1024);
        assert!(!config.webhook.demo);
    }

    #[test]
    fn test_submit_url_follows_environment() {
        let mut config = WebhookConfig::default();
        assert_eq!(config.submit_url(), config.test_url);

        config.environment = WebhookEnvironment::Production;
        assert_eq!(config.submit_url(), config.production_url);
        assert_eq!(config.environment.as_str(), "production");
    }

    #[test]
    fn test_public_base_url() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8001");
        assert_eq!(config.public_base_url(), "http://localhost:8001");
    }
}
