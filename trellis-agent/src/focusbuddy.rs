use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::Result;

const SESSION_MINUTES: u32 = 25;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    pub task: String,
    pub duration_min: u32,
}

/// One 25-minute focus session per task.
pub struct FocusBuddyAgent;

impl FocusBuddyAgent {
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn create_sessions(&self, input: &AgentInput) -> Vec<FocusSession> {
        input
            .tasks
            .iter()
            .map(|task| FocusSession {
                task: task.title.clone(),
                duration_min: SESSION_MINUTES,
            })
            .collect()
    }
}

impl Default for FocusBuddyAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuxiliaryAgent for FocusBuddyAgent {
    fn name(&self) -> &str {
        "focusbuddy"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        Ok(serde_json::to_value(self.create_sessions(input))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Priority, Task};

    #[test]
    fn one_session_per_task() {
        let tasks = vec![
            Task::new("write", "d", Priority::P1, 2).unwrap(),
            Task::new("review", "d", Priority::P2, 1).unwrap(),
        ];
        let sessions = FocusBuddyAgent::new().create_sessions(&AgentInput::new("g", tasks));
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.duration_min == 25));
        assert_eq!(sessions[0].task, "write");
    }
}
