//! The Trellis planning pipeline.
//!
//! A fixed sequence of LLM-backed stages turns a free-text goal into tasks
//! and sprints: plan → prioritize → estimate → package. Interactive runs
//! prepend a clarify stage (ask questions while the goal is too vague) and
//! an integrate stage (fold the answers back into an enriched goal).

mod context;
mod parse;
mod pipeline;
mod prompts;
mod stage;
mod stages;
mod state;

pub use context::PlannerContext;
pub use parse::{
    ClarifyDecision, extract_json_array, extract_json_object, parse_clarify_decision,
    parse_sprints, parse_subtasks, parse_tasks,
};
pub use pipeline::PlanPipeline;
pub use prompts::MAX_CLARIFICATION_QUESTIONS;
pub use stage::Stage;
pub use stages::{
    ClarifyStage, EstimateStage, IntegrateStage, MAX_CLARIFICATION_ROUNDS, PackageStage,
    PlanStage, PrioritizeStage,
};
pub use state::{ClarifyOutcome, PlanState, StageUpdate};
