use std::sync::Arc;
use tracing::warn;
use trellis_memory::{MemoryEntry, MemorySink};
use trellis_model::ProviderRouter;
use trellis_session::{PreferencesStore, SessionManager, UserPreferences};

/// Everything the planning stages collaborate with, passed explicitly.
///
/// Cloning is cheap (all handles); there are no process-wide singletons
/// behind it.
#[derive(Clone)]
pub struct PlannerContext {
    pub provider: Arc<ProviderRouter>,
    pub memory: Arc<dyn MemorySink>,
    pub sessions: Arc<SessionManager>,
    pub preferences: Arc<dyn PreferencesStore>,
    pub user_id: String,
}

impl PlannerContext {
    pub fn new(
        provider: Arc<ProviderRouter>,
        memory: Arc<dyn MemorySink>,
        sessions: Arc<SessionManager>,
        preferences: Arc<dyn PreferencesStore>,
    ) -> Self {
        Self {
            provider,
            memory,
            sessions,
            preferences,
            user_id: "default".to_string(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Preferences for the context's user; a failed read degrades to defaults.
    pub(crate) async fn load_preferences(&self) -> UserPreferences {
        match self.preferences.get_preferences(&self.user_id).await {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "preference read failed, using defaults");
                UserPreferences::for_user(&self.user_id)
            }
        }
    }

    /// Best-effort memory write; a failure is logged, never surfaced.
    pub(crate) async fn remember(&self, source: &str, content: String) {
        if let Err(err) = self.memory.record(MemoryEntry::new(source, content)).await {
            warn!(source = source, error = %err, "memory write failed, continuing");
        }
    }
}
