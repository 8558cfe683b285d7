use crate::service::{MemoryEntry, MemorySink, PlanHistory, PlanHistoryService};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use trellis_core::Result;

pub struct InMemorySink {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self { entries: Arc::new(RwLock::new(Vec::new())) }
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemorySink for InMemorySink {
    async fn record(&self, entry: MemoryEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MemoryEntry>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }
}

#[derive(Clone)]
struct StoredPlan {
    words: HashSet<String>,
    record: PlanHistory,
}

/// Keyword-matching plan history.
///
/// Search tokenizes the query and each stored goal into lowercase word sets
/// and returns records whose sets intersect, newest first.
pub struct InMemoryPlanHistory {
    plans: Arc<RwLock<Vec<StoredPlan>>>,
}

impl InMemoryPlanHistory {
    pub fn new() -> Self {
        Self { plans: Arc::new(RwLock::new(Vec::new())) }
    }

    fn extract_words(text: &str) -> HashSet<String> {
        text.split_whitespace()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }

    fn has_intersection(set1: &HashSet<String>, set2: &HashSet<String>) -> bool {
        if set1.is_empty() || set2.is_empty() {
            return false;
        }
        set1.iter().any(|word| set2.contains(word))
    }
}

impl Default for InMemoryPlanHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanHistoryService for InMemoryPlanHistory {
    async fn add_plan(&self, record: PlanHistory) -> Result<()> {
        let words = Self::extract_words(&record.goal);
        let mut plans = self.plans.write().unwrap_or_else(|e| e.into_inner());
        plans.push(StoredPlan { words, record });
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlanHistory>> {
        let query_words = Self::extract_words(query);
        let plans = self.plans.read().unwrap_or_else(|e| e.into_inner());

        let matches: Vec<PlanHistory> = plans
            .iter()
            .rev()
            .filter(|stored| Self::has_intersection(&stored.words, &query_words))
            .take(limit)
            .map(|stored| stored.record.clone())
            .collect();

        Ok(matches)
    }
}
