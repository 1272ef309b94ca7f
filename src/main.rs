//! Tap In - 冥想引导表单与音频播放服务
//!
//! 组装各层：配置 → 步骤目录 → 工作流客户端 → 内存存储 → HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use tapin::application::{
    AudioProbePort, AudioStorePort, FlowSession, PlaybackEntry, SessionStorePort, WorkflowPort,
};
use tapin::config::{load_config, print_config, AppConfig};
use tapin::domain::flow::{StepCatalog, SubmissionContext};
use tapin::infrastructure::adapters::{
    FakeWorkflowClient, HttpWorkflowClient, HttpWorkflowClientConfig, SymphoniaProbe,
};
use tapin::infrastructure::events::EventPublisher;
use tapin::infrastructure::http::{AppState, FlowSettings, HttpServer, ServerConfig};
use tapin::infrastructure::memory::{InMemoryAudioStore, InMemorySessionStore};
use tapin::infrastructure::worker::{SessionReaper, SessionReaperConfig};

/// 演示模式下模拟的工作流耗时
const DEMO_LATENCY: Duration = Duration::from_millis(1500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},tapin={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Tap In - 冥想引导服务");
    print_config(&config);

    // 步骤目录
    let catalog = match &config.flow.catalog_path {
        Some(path) => StepCatalog::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load step catalog {:?}: {}", path, e))?,
        None => StepCatalog::tap_in_default(),
    };
    tracing::info!(steps = catalog.len(), "Step catalog ready");
    let catalog = Arc::new(catalog);

    // 生成工作流
    let workflow = build_workflow(&config)?;

    // 内存存储
    let flow_store: Arc<dyn SessionStorePort<FlowSession>> =
        InMemorySessionStore::<FlowSession>::new().arc();
    let playback_store: Arc<dyn SessionStorePort<PlaybackEntry>> =
        InMemorySessionStore::<PlaybackEntry>::new().arc();
    let audio_store: Arc<dyn AudioStorePort> =
        InMemoryAudioStore::new(config.playback.max_audio_bytes).arc();
    let audio_probe: Arc<dyn AudioProbePort> = Arc::new(SymphoniaProbe::new());

    // 创建事件发布器
    let event_publisher = EventPublisher::new().arc();

    let settings = FlowSettings {
        auto_advance_delay: Duration::from_millis(config.flow.auto_advance_delay_ms),
        submission_context: submission_context(&config),
    };

    let state = Arc::new(AppState::new(
        catalog,
        flow_store.clone(),
        playback_store.clone(),
        audio_store,
        workflow,
        audio_probe,
        event_publisher,
        settings,
    ));

    // 启动空闲会话回收
    if config.gc.enabled {
        let reaper = SessionReaper::new(
            SessionReaperConfig {
                interval: Duration::from_secs(config.gc.interval_secs),
                session_expire_secs: config.gc.session_expire_secs,
            },
            flow_store,
            playback_store,
            state.close_flow_handler.clone(),
            state.release_playback_handler.clone(),
        );
        tokio::spawn(reaper.run());
    }

    // 创建 HTTP 服务器
    let mut server_config = ServerConfig::new(&config.server.host, config.server.port);
    if config.server.static_files.enabled {
        server_config = server_config.with_static_dir(config.server.static_files.dir.clone());
    }
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn build_workflow(config: &AppConfig) -> anyhow::Result<Arc<dyn WorkflowPort>> {
    let webhook = &config.webhook;
    if webhook.demo {
        tracing::warn!("Demo mode enabled, submissions return the built-in sample response");
        return Ok(Arc::new(FakeWorkflowClient::new().with_latency(DEMO_LATENCY)));
    }

    let client_config =
        HttpWorkflowClientConfig::new(webhook.submit_url(), webhook.file_base_url.as_str())
            .with_timeout(webhook.timeout_secs)
            .with_retries(webhook.audio_fetch_retries, webhook.retry_delay_ms)
            .with_max_audio_bytes(config.playback.max_audio_bytes);
    let client = HttpWorkflowClient::new(client_config)
        .map_err(|e| anyhow::anyhow!("Failed to create workflow client: {}", e))?;
    Ok(Arc::new(client))
}

fn submission_context(config: &AppConfig) -> SubmissionContext {
    config.webhook.context.iter().fold(
        SubmissionContext::new(config.webhook.environment.as_str()),
        |ctx, (key, value)| ctx.with_field(key.as_str(), value.as_str()),
    )
}
