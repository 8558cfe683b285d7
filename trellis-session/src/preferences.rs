use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use trellis_core::Result;

/// Per-user planning preferences, folded into prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub sprint_length_weeks: u32,
    pub tone: String,
    pub work_hours_per_week: u32,
    pub task_size: String,
    pub include_breaks: bool,
    pub timezone: String,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), ..Self::default() }
    }

    /// Renders the preferences as a single prompt-friendly line.
    #[must_use]
    pub fn to_prompt_context(&self) -> String {
        format!(
            "sprint length: {} weeks; preferred tone: {}; work hours per week: {}; \
             task size: {}; include breaks: {}; timezone: {}",
            self.sprint_length_weeks,
            self.tone,
            self.work_hours_per_week,
            self.task_size,
            if self.include_breaks { "yes" } else { "no" },
            self.timezone
        )
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            user_id: "default".to_string(),
            sprint_length_weeks: 2,
            tone: "professional".to_string(),
            work_hours_per_week: 40,
            task_size: "medium".to_string(),
            include_breaks: true,
            timezone: "UTC".to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// Preference persistence. Reads fall back to defaults when nothing is stored.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences>;
    async fn save_preferences(&self, preferences: UserPreferences) -> Result<()>;
}

pub struct InMemoryPreferencesStore {
    prefs: Arc<RwLock<HashMap<String, UserPreferences>>>,
}

impl InMemoryPreferencesStore {
    pub fn new() -> Self {
        Self { prefs: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for InMemoryPreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferencesStore for InMemoryPreferencesStore {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let prefs = self.prefs.read().unwrap_or_else(|e| e.into_inner());
        Ok(prefs
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferences::for_user(user_id)))
    }

    async fn save_preferences(&self, mut preferences: UserPreferences) -> Result<()> {
        preferences.updated_at = Utc::now();
        let mut prefs = self.prefs.write().unwrap_or_else(|e| e.into_inner());
        prefs.insert(preferences.user_id.clone(), preferences);
        Ok(())
    }
}
