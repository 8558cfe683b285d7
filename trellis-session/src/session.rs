use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One clarification dialogue: the goal under discussion plus the
/// question/answer exchange so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub goal: String,
    pub messages: Vec<SessionMessage>,
    pub clarification_count: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(goal: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            goal: goal.into(),
            messages: Vec::new(),
            clarification_count: 0,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        let now = Utc::now();
        self.messages.push(SessionMessage {
            role,
            content: content.into(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// The last `limit` messages, oldest first.
    #[must_use]
    pub fn context(&self, limit: usize) -> &[SessionMessage] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active_and_empty() {
        let session = ConversationSession::new("Build an app");
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.clarification_count, 0);
        assert!(session.messages.is_empty());
        assert!(!session.session_id.is_empty());
    }

    #[test]
    fn test_context_returns_most_recent() {
        let mut session = ConversationSession::new("goal");
        for i in 0..5 {
            session.add_message(MessageRole::User, format!("msg {i}"));
        }
        let last_two = session.context(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].content, "msg 3");
        assert_eq!(last_two[1].content, "msg 4");
        assert_eq!(session.context(100).len(), 5);
    }

    #[test]
    fn test_add_message_bumps_updated_at() {
        let mut session = ConversationSession::new("goal");
        let before = session.updated_at;
        session.add_message(MessageRole::Assistant, "What platform?");
        assert!(session.updated_at >= before);
    }
}
