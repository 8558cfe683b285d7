use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use trellis_core::Result;
use trellis_memory::{MemoryEntry, MemorySink};

/// Captures a one-line note about the plan into memory.
pub struct ScribeAgent {
    memory: Arc<dyn MemorySink>,
}

impl ScribeAgent {
    pub fn new(memory: Arc<dyn MemorySink>) -> Self {
        Self { memory }
    }

    #[must_use]
    pub fn summarize(&self, input: &AgentInput) -> String {
        format!("Recorded {} tasks for '{}'.", input.tasks.len(), input.goal)
    }
}

#[async_trait]
impl AuxiliaryAgent for ScribeAgent {
    fn name(&self) -> &str {
        "scribe"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        let note = self.summarize(input);
        if let Err(err) = self
            .memory
            .record(MemoryEntry::new("scribe", note.clone()))
            .await
        {
            warn!(error = %err, "scribe note was not persisted");
        }
        Ok(Value::String(note))
    }
}
