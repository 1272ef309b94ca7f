//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置；可选托管前端静态文件

use std::path::PathBuf;
use std::sync::Arc;

use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 单页应用的静态文件目录
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// 构建 Router
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600));

        let mut router = create_routes();

        // 未匹配的路径交给单页应用
        if let Some(dir) = &self.config.static_dir {
            let index = dir.join("index.html");
            router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
        }

        router
            .layer(middleware::from_fn(error_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let addr = self.config.addr();

        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::StepCatalog;
    use crate::infrastructure::adapters::{FakeWorkflowClient, SymphoniaProbe};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::http::state::FlowSettings;
    use crate::infrastructure::memory::{InMemoryAudioStore, InMemorySessionStore};
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_router() -> Router {
        let state = AppState::new(
            Arc::new(StepCatalog::tap_in_default()),
            InMemorySessionStore::<crate::application::FlowSession>::new().arc(),
            InMemorySessionStore::<crate::application::PlaybackEntry>::new().arc(),
            InMemoryAudioStore::new(1024 * 1024).arc(),
            Arc::new(FakeWorkflowClient::new()),
            Arc::new(SymphoniaProbe::new()),
            EventPublisher::new().arc(),
            FlowSettings::default(),
        );
        HttpServer::new(ServerConfig::default(), Arc::new(state)).router()
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn call_json(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let (status, bytes) = call(router, method, uri, body).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post(router: &Router, uri: &str, body: Value) -> Value {
        call_json(router, "POST", uri, Some(body)).await
    }

    #[tokio::test]
    async fn test_ping() {
        let router = test_router();
        let body = call_json(&router, "GET", "/api/ping", None).await;
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_catalog_lists_steps() {
        let router = test_router();
        let body = call_json(&router, "GET", "/api/flow/catalog", None).await;
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["steps"][0]["id"], "intro");
    }

    #[tokio::test]
    async fn test_unknown_flow_is_not_found() {
        let router = test_router();
        let body = post(&router, "/api/flow/get", json!({ "flow_id": "missing" })).await;
        assert_eq!(body["errno"], 404);
    }

    #[tokio::test]
    async fn test_answer_required_before_next() {
        let router = test_router();
        let started = call_json(&router, "POST", "/api/flow/start", None).await;
        let flow_id = started["data"]["flow_id"].as_str().unwrap().to_string();

        let body = post(&router, "/api/flow/next", json!({ "flow_id": flow_id })).await;
        assert_eq!(body["data"]["current_index"], 1);

        // source 未回答，不能前进
        let body = post(&router, "/api/flow/next", json!({ "flow_id": flow_id })).await;
        assert_eq!(body["errno"], 400);
    }

    #[tokio::test]
    async fn test_full_flow_submit_and_release() {
        let router = test_router();
        let started = call_json(&router, "POST", "/api/flow/start", None).await;
        let flow_id = started["data"]["flow_id"].as_str().unwrap().to_string();
        let id = json!(flow_id);

        post(&router, "/api/flow/next", json!({ "flow_id": id })).await;
        let answers = [
            ("source", json!("quick_shift")),
            ("loop", json!("overthinking")),
            ("feeling", json!("calm")),
        ];
        for (step_id, value) in answers {
            let body = post(
                &router,
                "/api/flow/answer",
                json!({ "flow_id": id, "step_id": step_id, "value": value }),
            )
            .await;
            assert_eq!(body["errno"], 0, "answer {} failed: {}", step_id, body);
            post(&router, "/api/flow/next", json!({ "flow_id": id })).await;
        }

        // imagery 多选
        let body = post(
            &router,
            "/api/flow/toggle",
            json!({ "flow_id": id, "step_id": "imagery", "value": "river" }),
        )
        .await;
        assert_eq!(body["data"]["answers"]["imagery"], json!(["river"]));
        post(&router, "/api/flow/next", json!({ "flow_id": id })).await;

        for (step_id, value) in [("opening", json!("i-am")), ("duration", json!("3"))] {
            post(
                &router,
                "/api/flow/answer",
                json!({ "flow_id": id, "step_id": step_id, "value": value }),
            )
            .await;
            post(&router, "/api/flow/next", json!({ "flow_id": id })).await;
        }
        post(&router, "/api/flow/skip", json!({ "flow_id": id })).await;
        let body = post(
            &router,
            "/api/flow/answer",
            json!({ "flow_id": id, "step_id": "consent", "value": true }),
        )
        .await;
        assert_eq!(body["data"]["is_last_step"], true);
        assert_eq!(body["data"]["can_advance"], true);

        let body = post(&router, "/api/flow/submit", json!({ "flow_id": id })).await;
        assert_eq!(body["errno"], 0, "submit failed: {}", body);
        let playback_id = body["data"]["playback"]["playback_id"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(
            body["data"]["flow"]["response"]["affirmation"]["metadata"]["start_phrase"],
            "I am"
        );

        // 等待后台音频获取
        let mut audio_url = None;
        for _ in 0..50 {
            let view = post(&router, "/api/playback/get", json!({ "playback_id": playback_id })).await;
            if let Some(url) = view["data"]["audio_url"].as_str() {
                audio_url = Some(url.to_string());
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let audio_url = audio_url.expect("audio should be attached");

        let (status, bytes) = call(&router, "GET", &audio_url, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[0..4], b"RIFF");

        let body = post(&router, "/api/playback/release", json!({ "playback_id": playback_id })).await;
        assert_eq!(body["data"]["released"], true);
        let body = post(&router, "/api/playback/release", json!({ "playback_id": playback_id })).await;
        assert_eq!(body["data"]["released"], false);

        // 释放后音频不可再取
        let body = call_json(&router, "GET", &audio_url, None).await;
        assert_eq!(body["errno"], 404);
    }

    #[tokio::test]
    async fn test_static_fallback_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>tap in</html>").unwrap();

        let state = AppState::new(
            Arc::new(StepCatalog::tap_in_default()),
            InMemorySessionStore::<crate::application::FlowSession>::new().arc(),
            InMemorySessionStore::<crate::application::PlaybackEntry>::new().arc(),
            InMemoryAudioStore::new(1024).arc(),
            Arc::new(FakeWorkflowClient::new()),
            Arc::new(SymphoniaProbe::new()),
            EventPublisher::new().arc(),
            FlowSettings::default(),
        );
        let router = HttpServer::new(
            ServerConfig::default().with_static_dir(dir.path()),
            Arc::new(state),
        )
        .router();

        let (status, bytes) = call(&router, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"<html>tap in</html>");
    }
}
