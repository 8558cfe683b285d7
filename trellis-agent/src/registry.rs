//! Name-keyed registry of auxiliary agents.
//!
//! Agents are registered as factories so construction stays lazy; `get`
//! builds a fresh instance per call. Plugin loading is one-shot and never
//! displaces a built-in name.

use crate::{
    AuxiliaryAgent, ChronosAgent, FocusBuddyAgent, GuardianAgent, LiaisonAgent, MentorAgent,
    ScribeAgent,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};
use trellis_core::{Result, TrellisError};
use trellis_memory::MemorySink;
use trellis_model::ProviderRouter;
use trellis_session::PreferencesStore;

pub type AgentFactory = Arc<dyn Fn() -> Arc<dyn AuxiliaryAgent> + Send + Sync>;

pub struct AgentRegistry {
    factories: RwLock<HashMap<String, AgentFactory>>,
    plugins_loaded: AtomicBool,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            plugins_loaded: AtomicBool::new(false),
        }
    }

    /// Registry pre-populated with the six built-in agents.
    pub fn with_builtins(
        provider: Arc<ProviderRouter>,
        memory: Arc<dyn MemorySink>,
        preferences: Arc<dyn PreferencesStore>,
    ) -> Self {
        let registry = Self::new();
        registry.register("chronos", || Arc::new(ChronosAgent::new()));
        registry.register("guardian", || Arc::new(GuardianAgent::new()));
        registry.register("mentor", || Arc::new(MentorAgent::new()));
        registry.register("focusbuddy", || Arc::new(FocusBuddyAgent::new()));
        {
            let memory = Arc::clone(&memory);
            registry.register("scribe", move || Arc::new(ScribeAgent::new(Arc::clone(&memory))));
        }
        registry.register("liaison", move || {
            Arc::new(LiaisonAgent::new(
                Arc::clone(&provider),
                Arc::clone(&preferences),
                Arc::clone(&memory),
            ))
        });
        registry
    }

    pub fn register<F, A>(&self, name: &str, factory: F)
    where
        F: Fn() -> Arc<A> + Send + Sync + 'static,
        A: AuxiliaryAgent + 'static,
    {
        let factory: AgentFactory = Arc::new(move || factory() as Arc<dyn AuxiliaryAgent>);
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|e| e.into_inner());
        factories.insert(name.to_string(), factory);
    }

    pub fn register_instance(&self, name: &str, agent: Arc<dyn AuxiliaryAgent>) {
        let factory: AgentFactory = Arc::new(move || Arc::clone(&agent));
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|e| e.into_inner());
        factories.insert(name.to_string(), factory);
    }

    /// Builds the agent registered under `name`. Unknown names are a
    /// [`TrellisError::Config`]; callers that tolerate absent agents skip on
    /// that error instead of aborting.
    pub fn get(&self, name: &str) -> Result<Arc<dyn AuxiliaryAgent>> {
        let factories = self.factories.read().unwrap_or_else(|e| e.into_inner());
        factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| TrellisError::Config(format!("agent '{name}' is not registered")))
    }

    /// Registered agent names, sorted for stable iteration.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Adds third-party agents. Only the first call has any effect, and a
    /// plugin can never shadow an already-registered name.
    pub fn load_plugins(&self, plugins: Vec<(String, AgentFactory)>) {
        if self.plugins_loaded.swap(true, Ordering::SeqCst) {
            debug!("plugins already loaded, ignoring");
            return;
        }
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|e| e.into_inner());
        for (name, factory) in plugins {
            if factories.contains_key(&name) {
                warn!(agent = %name, "plugin name collides with a registered agent, skipped");
                continue;
            }
            debug!(agent = %name, "plugin agent registered");
            factories.insert(name, factory);
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentInput;
    use async_trait::async_trait;
    use serde_json::Value;
    use trellis_core::Result;
    use trellis_memory::InMemorySink;
    use trellis_model::MockChat;
    use trellis_session::InMemoryPreferencesStore;

    impl std::fmt::Debug for dyn AuxiliaryAgent {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("AuxiliaryAgent").field("name", &self.name()).finish()
        }
    }

    fn builtins() -> AgentRegistry {
        let router = Arc::new(
            ProviderRouter::new("mock").register_instance("mock", Arc::new(MockChat::new("mock"))),
        );
        AgentRegistry::with_builtins(
            router,
            Arc::new(InMemorySink::new()),
            Arc::new(InMemoryPreferencesStore::new()),
        )
    }

    struct EchoAgent;

    #[async_trait]
    impl AuxiliaryAgent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, input: &AgentInput) -> Result<Value> {
            Ok(Value::String(input.goal.clone()))
        }
    }

    #[test]
    fn builtins_are_all_present() {
        let registry = builtins();
        assert_eq!(
            registry.names(),
            vec!["chronos", "focusbuddy", "guardian", "liaison", "mentor", "scribe"]
        );
        assert!(registry.get("chronos").is_ok());
        assert!(matches!(
            registry.get("nonexistent").unwrap_err(),
            TrellisError::Config(_)
        ));
    }

    #[tokio::test]
    async fn registered_instance_is_returned() {
        let registry = AgentRegistry::new();
        registry.register_instance("echo", Arc::new(EchoAgent));

        let agent = registry.get("echo").unwrap();
        let value = agent.run(&AgentInput::new("hi", vec![])).await.unwrap();
        assert_eq!(value, Value::String("hi".into()));
    }

    #[test]
    fn plugins_load_once_and_never_shadow() {
        let registry = builtins();
        let make = || -> AgentFactory { Arc::new(|| Arc::new(EchoAgent) as Arc<dyn AuxiliaryAgent>) };

        registry.load_plugins(vec![
            ("echo".to_string(), make()),
            ("mentor".to_string(), make()),
        ]);
        assert!(registry.get("echo").is_ok());
        // The built-in mentor still answers for its name.
        assert_eq!(registry.get("mentor").unwrap().name(), "mentor");

        registry.load_plugins(vec![("late".to_string(), make())]);
        assert!(registry.get("late").is_err());
    }
}
