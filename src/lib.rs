//! Tap In - 冥想引导表单与音频播放服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Flow Context: 条件可见的多步骤表单、答案校验与提交 payload
//! - Playback Context: 冥想文本分段、播放状态机与高亮同步
//!
//! 应用层 (application/):
//! - Ports: 端口定义（WorkflowPort, SessionStore, AudioStore, AudioProbe, AutoAdvance）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: 会话存储、音频句柄、自动前进调度
//! - Worker: SessionReaper 空闲会话回收
//! - Adapters: 生成工作流客户端（HTTP / 演示）、音频时长探测
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
