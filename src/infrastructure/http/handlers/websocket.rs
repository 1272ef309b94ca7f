//! WebSocket Handler
//!
//! 每个表单一个事件通道：步骤变化（含自动前进）、提交进度、音频就绪、播放进度

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::infrastructure::http::state::AppState;

/// 表单 WebSocket 连接处理
pub async fn flow_websocket_handler(
    ws: WebSocketUpgrade,
    Path(flow_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_flow_socket(socket, flow_id, state))
}

async fn handle_flow_socket(socket: WebSocket, flow_id: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // 验证表单存在
    if state.flow_store.get(&flow_id).is_err() {
        tracing::warn!(flow_id = %flow_id, "WebSocket connection rejected: unknown flow");
        let _ = sender.close().await;
        return;
    }

    let mut event_rx = state.event_publisher.register_flow(&flow_id);
    tracing::info!(flow_id = %flow_id, "WebSocket connected");

    let flow_id_for_forward = flow_id.clone();
    let flow_id_for_receive = flow_id.clone();

    // 事件转发任务
    let forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        flow_id = %flow_id_for_forward,
                        skipped = skipped,
                        "WebSocket consumer lagging, events dropped"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let msg = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(
                    flow_id = %flow_id_for_forward,
                    error = %e,
                    "Failed to send WebSocket message"
                );
                break;
            }
        }
    });

    // 接收客户端消息（心跳）
    let flow_store = state.flow_store.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(flow_id = %flow_id_for_receive, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(flow_id = %flow_id_for_receive, error = %e, "WebSocket error");
                    break;
                }
                _ => flow_store.touch(&flow_id_for_receive),
            }
        }
    });

    // 等待任一任务完成
    tokio::select! {
        _ = forward_task => {}
        _ = receive_task => {}
    }

    state.event_publisher.unregister_flow(&flow_id);
    tracing::info!(flow_id = %flow_id, "WebSocket disconnected");
}
