//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `TAPIN_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `TAPIN_SERVER__PORT=8080`
/// - `TAPIN_WEBHOOK__ENVIRONMENT=production`
/// - `TAPIN_WEBHOOK__DEMO=true`
/// - `TAPIN_FLOW__AUTO_ADVANCE_DELAY_MS=500`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", defaults.server.host.as_str())?
        .set_default("server.port", defaults.server.port as i64)?
        .set_default("server.static_files.enabled", false)?
        .set_default("server.static_files.dir", "web")?
        .set_default("webhook.environment", defaults.webhook.environment.as_str())?
        .set_default("webhook.test_url", defaults.webhook.test_url.as_str())?
        .set_default("webhook.production_url", defaults.webhook.production_url.as_str())?
        .set_default("webhook.file_base_url", defaults.webhook.file_base_url.as_str())?
        .set_default("webhook.timeout_secs", defaults.webhook.timeout_secs as i64)?
        .set_default(
            "webhook.audio_fetch_retries",
            defaults.webhook.audio_fetch_retries as i64,
        )?
        .set_default("webhook.retry_delay_ms", defaults.webhook.retry_delay_ms as i64)?
        .set_default("webhook.demo", false)?
        .set_default(
            "flow.auto_advance_delay_ms",
            defaults.flow.auto_advance_delay_ms as i64,
        )?
        .set_default(
            "playback.max_audio_bytes",
            defaults.playback.max_audio_bytes as i64,
        )?
        .set_default("gc.enabled", defaults.gc.enabled)?
        .set_default("gc.interval_secs", defaults.gc.interval_secs as i64)?
        .set_default("gc.session_expire_secs", defaults.gc.session_expire_secs as i64)?
        .set_default("log.level", defaults.log.level.as_str())?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: TAPIN_WEBHOOK__PRODUCTION_URL=https://example.com/webhook/tap-in
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("TAPIN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    // 演示模式不访问网络，可以不配置地址
    if !config.webhook.demo {
        if config.webhook.submit_url().trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Webhook URL for environment '{}' cannot be empty",
                config.webhook.environment.as_str()
            )));
        }
        if config.webhook.file_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Webhook file base URL cannot be empty".to_string(),
            ));
        }
    }

    if config.webhook.audio_fetch_retries == 0 {
        return Err(ConfigError::ValidationError(
            "Audio fetch retries must be at least 1".to_string(),
        ));
    }

    if config.playback.max_audio_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Max audio bytes cannot be 0".to_string(),
        ));
    }

    if config.gc.enabled && config.gc.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "GC interval cannot be 0 when GC is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    if config.server.static_files.enabled {
        tracing::info!("Static Files: {:?}", config.server.static_files.dir);
    }
    if config.webhook.demo {
        tracing::info!("Workflow: demo responses (no network)");
    } else {
        tracing::info!(
            "Workflow: {} ({})",
            config.webhook.submit_url(),
            config.webhook.environment.as_str()
        );
        tracing::info!("Audio Files: {}/{{id}}", config.webhook.file_base_url);
    }
    tracing::info!("Workflow Timeout: {}s", config.webhook.timeout_secs);
    tracing::info!("Auto Advance Delay: {}ms", config.flow.auto_advance_delay_ms);
    match &config.flow.catalog_path {
        Some(path) => tracing::info!("Step Catalog: {:?}", path),
        None => tracing::info!("Step Catalog: built-in"),
    }
    tracing::info!("GC Enabled: {}", config.gc.enabled);
    if config.gc.enabled {
        tracing::info!("GC Interval: {}s", config.gc.interval_secs);
        tracing::info!("Session Expire: {}s", config.gc.session_expire_secs);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::WebhookEnvironment;
    use std::path::PathBuf;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
port = 9100

[webhook]
environment = "production"
production_url = "https://example.com/webhook/tap-in"

[webhook.context]
channel = "kiosk"

[flow]
auto_advance_delay_ms = 500
"#,
        );

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.webhook.environment, WebhookEnvironment::Production);
        assert_eq!(
            config.webhook.submit_url(),
            "https://example.com/webhook/tap-in"
        );
        assert_eq!(
            config.webhook.context.get("channel").map(String::as_str),
            Some("kiosk")
        );
        assert_eq!(config.flow.auto_advance_delay_ms, 500);
        assert_eq!(config.gc.interval_secs, 60);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            load_config_from_path(Some(&path)),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[webhook]\nenvironment = \"staging\"\n");
        assert!(matches!(
            load_config_from_path(Some(&path)),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_selected_url_allowed_only_in_demo() {
        let mut config = AppConfig::default();
        config.webhook.test_url = String::new();
        assert!(validate_config(&config).is_err());

        // 未选中的环境地址为空不影响
        config.webhook.environment = WebhookEnvironment::Production;
        assert!(validate_config(&config).is_ok());

        config.webhook.production_url = String::new();
        config.webhook.file_base_url = String::new();
        config.webhook.demo = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_retries() {
        let mut config = AppConfig::default();
        config.webhook.audio_fetch_retries = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_gc_interval_only_matters_when_enabled() {
        let mut config = AppConfig::default();
        config.gc.interval_secs = 0;
        assert!(validate_config(&config).is_err());

        config.gc.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
