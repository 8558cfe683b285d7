use crate::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};
use trellis_core::{ChatMessage, ChatProvider, Result, TrellisError};

pub type ProviderFactory = Arc<dyn Fn() -> Result<Arc<dyn ChatProvider>> + Send + Sync>;

/// Routes chat calls to a named provider backend.
///
/// The active provider name is resolved at call time, so swapping backends
/// mid-process redirects every subsequent call without touching callers.
/// Instances are built lazily from registered factories and cached per name;
/// each name also gets its own [`CircuitBreaker`], created on first use and
/// kept for the router's lifetime.
pub struct ProviderRouter {
    active: RwLock<String>,
    factories: HashMap<String, ProviderFactory>,
    instances: Mutex<HashMap<String, Arc<dyn ChatProvider>>>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    breaker_config: CircuitBreakerConfig,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            active: RwLock::new(default_provider.into()),
            factories: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
            breakers: Mutex::new(HashMap::new()),
            breaker_config: CircuitBreakerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Registers a lazily-invoked constructor for `name`.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ChatProvider>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registers an already-constructed provider under `name`.
    #[must_use]
    pub fn register_instance(self, name: impl Into<String>, provider: Arc<dyn ChatProvider>) -> Self {
        self.register(name, move || Ok(Arc::clone(&provider)))
    }

    /// Switches the active provider. Takes effect on the next call.
    pub fn set_provider(&self, name: impl Into<String>) {
        let name = name.into();
        info!(provider = %name, "switching active provider");
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = name;
    }

    #[must_use]
    pub fn active_provider(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    #[must_use]
    pub fn known_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &str) -> Result<Arc<dyn ChatProvider>> {
        {
            let instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(provider) = instances.get(name) {
                return Ok(Arc::clone(provider));
            }
        }

        let factory = self.factories.get(name).ok_or_else(|| {
            TrellisError::Config(format!("unknown provider '{name}'"))
        })?;
        // Built outside the lock; a racing double-construction just means the
        // first insert wins.
        let provider = factory()?;
        debug!(provider = name, "constructed provider instance");

        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        let provider = instances
            .entry(name.to_string())
            .or_insert(provider)
            .clone();
        Ok(provider)
    }

    fn breaker_for(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(name, self.breaker_config.clone()))
            })
            .clone()
    }

    /// Stats snapshot for `name`'s breaker, if one has been created.
    pub async fn breaker_stats(&self, name: &str) -> Option<CircuitBreakerStats> {
        let breaker = {
            let breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
            breakers.get(name).cloned()
        };
        match breaker {
            Some(breaker) => Some(breaker.stats().await),
            None => None,
        }
    }

    /// Sends `messages` to the active provider through its circuit breaker.
    pub async fn chat(&self, messages: &[ChatMessage], tools: Option<&Value>) -> Result<String> {
        let name = self.active_provider();
        let provider = self.resolve(&name)?;
        let breaker = self.breaker_for(&name);
        breaker
            .call(|| async { provider.chat_complete(messages, tools).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockChat;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scripted(name: &str, replies: &[&str]) -> Arc<MockChat> {
        let mut mock = MockChat::new(name);
        for reply in replies {
            mock = mock.with_response(*reply);
        }
        Arc::new(mock)
    }

    #[tokio::test]
    async fn routes_to_active_provider() {
        let alpha = scripted("alpha", &["from alpha"]);
        let beta = scripted("beta", &["from beta"]);
        let router = ProviderRouter::new("alpha")
            .register_instance("alpha", alpha)
            .register_instance("beta", beta);

        let reply = router.chat(&[ChatMessage::user("hi")], None).await.unwrap();
        assert_eq!(reply, "from alpha");

        router.set_provider("beta");
        let reply = router.chat(&[ChatMessage::user("hi")], None).await.unwrap();
        assert_eq!(reply, "from beta");
    }

    #[tokio::test]
    async fn unknown_provider_is_a_config_error() {
        let router = ProviderRouter::new("missing");
        let err = router.chat(&[ChatMessage::user("hi")], None).await.unwrap_err();
        assert!(matches!(err, TrellisError::Config(_)));
    }

    #[tokio::test]
    async fn factory_runs_once_and_instance_is_cached() {
        let constructions = Arc::new(AtomicU32::new(0));
        let router = {
            let constructions = Arc::clone(&constructions);
            ProviderRouter::new("alpha").register("alpha", move || {
                constructions.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(
                    MockChat::new("alpha").with_response("one").with_response("two"),
                ) as Arc<dyn ChatProvider>)
            })
        };

        router.chat(&[ChatMessage::user("a")], None).await.unwrap();
        router.chat(&[ChatMessage::user("b")], None).await.unwrap();
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn breaker_guards_each_provider_independently() {
        let healthy = scripted("healthy", &["fine"]);
        let router = ProviderRouter::new("flaky")
            .register("flaky", || {
                Ok(Arc::new(MockChat::new("flaky")) as Arc<dyn ChatProvider>)
            })
            .register_instance("healthy", healthy);

        // An exhausted script returns an empty-response error on every call.
        for _ in 0..5 {
            assert!(router.chat(&[ChatMessage::user("x")], None).await.is_err());
        }
        let stats = router.breaker_stats("flaky").await.unwrap();
        assert_eq!(stats.state, crate::CircuitState::Open);

        router.set_provider("healthy");
        assert_eq!(
            router.chat(&[ChatMessage::user("x")], None).await.unwrap(),
            "fine"
        );
    }
}
