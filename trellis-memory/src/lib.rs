//! Memory services for Trellis: run-scoped notes and long-term plan history.

mod inmemory;
mod service;

pub use inmemory::{InMemoryPlanHistory, InMemorySink};
pub use service::{MemoryEntry, MemorySink, PlanHistory, PlanHistoryService};
