use crate::session::{ConversationSession, MessageRole, SessionStatus};
use crate::store::SessionStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use trellis_core::{Result, Sprint};
use trellis_memory::{MemoryEntry, PlanHistory, PlanHistoryService};

/// Session lifecycle on top of a pluggable store.
///
/// Sessions expire one hour after their last update; an expired session is
/// deleted on access and treated as absent. Completing a session moves its
/// transcript and final plan into long-term history.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    history: Arc<dyn PlanHistoryService>,
    session_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, history: Arc<dyn PlanHistoryService>) -> Self {
        Self {
            store,
            history,
            session_timeout: Duration::hours(1),
        }
    }

    #[must_use]
    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    pub async fn create_session(&self, goal: impl Into<String>) -> Result<ConversationSession> {
        let session = ConversationSession::new(goal);
        self.store.save(session.clone()).await?;
        Ok(session)
    }

    /// Fetches a live session, reaping it if it has expired.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        let Some(session) = self.store.get(session_id).await? else {
            return Ok(None);
        };
        if Utc::now() - session.updated_at < self.session_timeout {
            return Ok(Some(session));
        }
        debug!(session_id = session_id, "session expired, deleting");
        self.store.delete(session_id).await?;
        Ok(None)
    }

    /// Appends a message. Only user messages count toward the clarification
    /// budget; assistant questions do not.
    pub async fn update_session(
        &self,
        session_id: &str,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Option<ConversationSession>> {
        let Some(mut session) = self.get_session(session_id).await? else {
            return Ok(None);
        };
        session.add_message(role, content);
        if role == MessageRole::User {
            session.clarification_count += 1;
        }
        self.store.save(session.clone()).await?;
        Ok(Some(session))
    }

    /// Marks the session completed, archives it to plan history and removes
    /// it from the active store. A history write failure is logged and
    /// swallowed so completion never fails the plan that triggered it.
    pub async fn complete_session(
        &self,
        session_id: &str,
        final_plan: Option<Vec<Sprint>>,
    ) -> Result<()> {
        let Some(mut session) = self.get_session(session_id).await? else {
            return Ok(());
        };
        session.status = SessionStatus::Completed;

        let messages = session
            .messages
            .iter()
            .map(|msg| MemoryEntry {
                source: match msg.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
                timestamp: msg.timestamp,
            })
            .collect();

        let record = PlanHistory::new(session.goal.clone(), messages, final_plan);
        if let Err(err) = self.history.add_plan(record).await {
            warn!(session_id = session_id, error = %err, "failed to archive completed session");
        }

        self.store.delete(session_id).await
    }

    /// Past plans related to `query`. Lookup failures degrade to no history.
    pub async fn relevant_history(&self, query: &str, limit: usize) -> Vec<PlanHistory> {
        match self.history.search(query, limit).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "plan history lookup failed, continuing without it");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;
    use trellis_core::Priority;
    use trellis_core::Task;
    use trellis_memory::InMemoryPlanHistory;

    fn manager_with_handles() -> (SessionManager, Arc<InMemorySessionStore>, Arc<InMemoryPlanHistory>) {
        let store = Arc::new(InMemorySessionStore::new());
        let history = Arc::new(InMemoryPlanHistory::new());
        let manager = SessionManager::new(store.clone(), history.clone());
        (manager, store, history)
    }

    #[tokio::test]
    async fn create_and_get_session() {
        let (manager, _, _) = manager_with_handles();
        let session = manager.create_session("Build an app").await.unwrap();
        let fetched = manager.get_session(&session.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.goal, "Build an app");
        assert_eq!(fetched.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn expired_session_is_reaped_on_access() {
        let (manager, store, _) = manager_with_handles();
        let mut session = manager.create_session("stale goal").await.unwrap();
        let id = session.session_id.clone();

        session.updated_at = Utc::now() - Duration::hours(2);
        store.save(session).await.unwrap();

        assert!(manager.get_session(&id).await.unwrap().is_none());
        // Deleted, not just hidden.
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_user_messages_count_as_clarifications() {
        let (manager, _, _) = manager_with_handles();
        let session = manager.create_session("goal").await.unwrap();
        let id = session.session_id.clone();

        manager
            .update_session(&id, MessageRole::Assistant, "What platform?")
            .await
            .unwrap();
        let after_user = manager
            .update_session(&id, MessageRole::User, "iOS")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after_user.clarification_count, 1);
        assert_eq!(after_user.messages.len(), 2);
    }

    #[tokio::test]
    async fn update_of_unknown_session_returns_none() {
        let (manager, _, _) = manager_with_handles();
        let updated = manager
            .update_session("no-such-id", MessageRole::User, "hello")
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn complete_session_archives_and_deletes() {
        let (manager, store, history) = manager_with_handles();
        let session = manager.create_session("Build a todo app").await.unwrap();
        let id = session.session_id.clone();
        manager
            .update_session(&id, MessageRole::User, "keep it simple")
            .await
            .unwrap();

        let task = Task::new("Build MVP", "Ship the core flows", Priority::P0, 8).unwrap();
        let start = chrono::NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let sprint = Sprint::new("Sprint 1", start, end, vec![task]).unwrap();
        manager.complete_session(&id, Some(vec![sprint])).await.unwrap();

        assert!(store.get(&id).await.unwrap().is_none());
        let hits = history.search("todo", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].messages.len(), 1);
        assert!(hits[0].plan.is_some());
    }

    #[tokio::test]
    async fn relevant_history_returns_matches() {
        let (manager, _, history) = manager_with_handles();
        history
            .add_plan(PlanHistory::new("Build a todo app", vec![], None))
            .await
            .unwrap();
        let hits = manager.relevant_history("todo app ideas", 3).await;
        assert_eq!(hits.len(), 1);
    }
}
