//! Webhook Adapter - 外部生成工作流客户端

mod fake_workflow_client;
mod http_workflow_client;

pub use fake_workflow_client::{silent_wav, FakeWorkflowClient};
pub use http_workflow_client::*;
