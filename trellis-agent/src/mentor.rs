use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use serde_json::Value;
use trellis_core::Result;

/// Short motivational coaching.
pub struct MentorAgent;

impl MentorAgent {
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn coach(&self, goal: &str) -> String {
        format!("Stay focused on your goal: {goal}! You've got this.")
    }
}

impl Default for MentorAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuxiliaryAgent for MentorAgent {
    fn name(&self) -> &str {
        "mentor"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        Ok(Value::String(self.coach(&input.goal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encouragement_names_the_goal() {
        let msg = MentorAgent::new().coach("ship v1");
        assert!(msg.contains("ship v1"));
    }
}
