//! In-Memory Session Store Implementation

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{SessionError, SessionStorePort, StoredSession};

/// 内存会话存储（表单会话与播放会话共用）
pub struct InMemorySessionStore<T: StoredSession> {
    sessions: DashMap<String, T>,
}

impl<T: StoredSession> InMemorySessionStore<T> {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<T: StoredSession> Default for InMemorySessionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredSession> SessionStorePort<T> for InMemorySessionStore<T> {
    fn create(&self, session: T) -> Result<String, SessionError> {
        let session_id = session.session_id().to_string();
        match self.sessions.entry(session_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SessionError::AlreadyExists(session_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session);
                tracing::debug!(session_id = %session_id, "Session created");
                Ok(session_id)
            }
        }
    }

    fn get(&self, id: &str) -> Result<T, SessionError> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn update(&self, id: &str, f: &mut dyn FnMut(&mut T)) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        f(&mut session);
        session.touch();
        Ok(())
    }

    fn remove(&self, id: &str) -> Option<T> {
        self.sessions.remove(id).map(|(_, session)| {
            tracing::debug!(session_id = %id, "Session removed");
            session
        })
    }

    fn touch(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.touch();
        }
    }

    fn get_expired_sessions(&self, idle_timeout_secs: u64) -> Vec<String> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(idle_timeout_secs as i64);

        self.sessions
            .iter()
            .filter_map(|entry| {
                let elapsed = now - entry.last_activity();
                if elapsed > timeout {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .collect()
    }

    fn list_all(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}
