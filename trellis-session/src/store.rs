use crate::session::ConversationSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use trellis_core::Result;

/// Persistence backend for active sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<ConversationSession>>;
    async fn save(&self, session: ConversationSession) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;
    async fn all(&self) -> Result<Vec<ConversationSession>>;
}

pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, ConversationSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session: ConversationSession) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ConversationSession>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        Ok(sessions.values().cloned().collect())
    }
}
