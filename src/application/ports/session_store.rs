//! Session Store Port - 会话生命周期管理
//!
//! 表单会话与播放会话都只存在于内存中，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::WorkflowItem;
use crate::domain::flow::FlowState;
use crate::domain::playback::{PlaybackId, PlaybackSession};

/// Session Store 错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),
}

/// 可存入 SessionStore 的会话
pub trait StoredSession: Clone + Send + Sync + 'static {
    fn session_id(&self) -> &str;

    fn last_activity(&self) -> DateTime<Utc>;

    fn touch(&mut self);
}

/// 表单会话
#[derive(Debug, Clone)]
pub struct FlowSession {
    pub id: String,
    pub state: FlowState,
    /// 提交进行中（同一时间只允许一个提交）
    pub submitting: bool,
    /// 最近一次成功提交的响应
    pub response: Option<WorkflowItem>,
    pub playback_id: Option<PlaybackId>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl FlowSession {
    pub fn new(state: FlowState) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            state,
            submitting: false,
            response: None,
            playback_id: None,
            created_at: now,
            last_activity: now,
        }
    }
}

impl StoredSession for FlowSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// 播放会话（归属于某个表单）
#[derive(Debug, Clone)]
pub struct PlaybackEntry {
    pub id: String,
    pub flow_id: String,
    pub session: PlaybackSession,
    pub last_activity: DateTime<Utc>,
}

impl PlaybackEntry {
    pub fn new(flow_id: impl Into<String>, session: PlaybackSession) -> Self {
        Self {
            id: session.id().to_string(),
            flow_id: flow_id.into(),
            session,
            last_activity: Utc::now(),
        }
    }
}

impl StoredSession for PlaybackEntry {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Session Store Port
pub trait SessionStorePort<T: StoredSession>: Send + Sync {
    /// 创建新会话
    fn create(&self, session: T) -> Result<String, SessionError>;

    /// 获取会话快照
    fn get(&self, id: &str) -> Result<T, SessionError>;

    /// 在持有锁的情况下原地修改会话（同时刷新活动时间）
    fn update(&self, id: &str, f: &mut dyn FnMut(&mut T)) -> Result<(), SessionError>;

    /// 移除会话并返回
    fn remove(&self, id: &str) -> Option<T>;

    /// 更新最后活动时间
    fn touch(&self, id: &str);

    /// 获取所有过期会话的 ID
    fn get_expired_sessions(&self, idle_timeout_secs: u64) -> Vec<String>;

    /// 获取所有会话 ID
    fn list_all(&self) -> Vec<String>;
}

/// 原子地修改会话并取回闭包结果
pub fn modify_session<T, S, R>(
    store: &S,
    id: &str,
    f: impl FnOnce(&mut T) -> R,
) -> Result<R, SessionError>
where
    T: StoredSession,
    S: SessionStorePort<T> + ?Sized,
{
    let mut f = Some(f);
    let mut out = None;
    store.update(id, &mut |session: &mut T| {
        if let Some(f) = f.take() {
            out = Some(f(session));
        }
    })?;
    out.ok_or_else(|| SessionError::NotFound(id.to_string()))
}
