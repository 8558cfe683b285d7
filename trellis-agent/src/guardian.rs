use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use serde_json::Value;
use trellis_core::Result;

/// Injects wellness reminders, one for every two tasks.
pub struct GuardianAgent;

impl GuardianAgent {
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn suggest_breaks(&self, input: &AgentInput) -> Vec<String> {
        (0..input.tasks.len())
            .step_by(2)
            .map(|i| format!("Take a short break after task {}", i + 1))
            .collect()
    }
}

impl Default for GuardianAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuxiliaryAgent for GuardianAgent {
    fn name(&self) -> &str {
        "guardian"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        Ok(serde_json::to_value(self.suggest_breaks(input))?)
    }
}
