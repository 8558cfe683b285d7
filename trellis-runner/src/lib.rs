//! Orchestrated runs: plan a goal, then fan the task list out to the
//! auxiliary agents with per-agent isolation.

mod orchestrator;

pub use orchestrator::{FAN_OUT, Orchestrator, OrchestratorReport, RunMetadata};
