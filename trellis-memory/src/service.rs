use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_core::{Result, Sprint};

/// A single remembered line: which component said what, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub source: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget store for notes emitted during a run.
///
/// Writes are best-effort from the caller's perspective: stages and agents
/// log a failed `record` and keep going.
#[async_trait]
pub trait MemorySink: Send + Sync {
    async fn record(&self, entry: MemoryEntry) -> Result<()>;

    /// Most recent entries, newest last.
    async fn recent(&self, limit: usize) -> Result<Vec<MemoryEntry>>;
}

/// A completed planning run kept for future context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanHistory {
    pub goal: String,
    pub messages: Vec<MemoryEntry>,
    pub plan: Option<Vec<Sprint>>,
    pub completed_at: DateTime<Utc>,
}

impl PlanHistory {
    pub fn new(goal: impl Into<String>, messages: Vec<MemoryEntry>, plan: Option<Vec<Sprint>>) -> Self {
        Self {
            goal: goal.into(),
            messages,
            plan,
            completed_at: Utc::now(),
        }
    }
}

/// Long-term store of completed plans, searchable by goal keywords.
#[async_trait]
pub trait PlanHistoryService: Send + Sync {
    async fn add_plan(&self, record: PlanHistory) -> Result<()>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlanHistory>>;
}
