//! Auxiliary agents for Trellis.
//!
//! Agents consume the planned goal and task list and produce side outputs:
//! a day schedule, wellness nudges, focus sessions, drafted messages. They
//! are looked up by name in the [`AgentRegistry`] and run concurrently by
//! the orchestrator, which tolerates individual failures.

mod chronos;
mod focusbuddy;
mod guardian;
mod liaison;
mod mentor;
mod registry;
mod scribe;

use async_trait::async_trait;
use serde_json::Value;
use trellis_core::{Result, Task};

pub use chronos::{ChronosAgent, ScheduleBlock};
pub use focusbuddy::{FocusBuddyAgent, FocusSession};
pub use guardian::GuardianAgent;
pub use liaison::{
    Audience, DraftedMessage, GenerationMethod, LiaisonAgent, MessageType, Tone,
};
pub use mentor::MentorAgent;
pub use registry::{AgentFactory, AgentRegistry};
pub use scribe::ScribeAgent;

/// What every auxiliary agent gets to work with.
#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    pub goal: String,
    pub tasks: Vec<Task>,
}

impl AgentInput {
    pub fn new(goal: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self { goal: goal.into(), tasks }
    }
}

/// A named agent producing an arbitrary JSON payload.
#[async_trait]
pub trait AuxiliaryAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, input: &AgentInput) -> Result<Value>;
}
