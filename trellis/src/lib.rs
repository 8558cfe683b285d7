//! Trellis turns a free-text goal into prioritized, estimated, sprint-packaged
//! tasks, then fans the plan out to auxiliary agents for schedules, wellness
//! nudges, and drafted messages.
//!
//! The facade re-exports every subcrate; most callers want [`prelude`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! # async fn example(router: Arc<ProviderRouter>) -> trellis::Result<()> {
//! let memory = Arc::new(InMemorySink::new());
//! let sessions = Arc::new(SessionManager::new(
//!     Arc::new(InMemorySessionStore::new()),
//!     Arc::new(InMemoryPlanHistory::new()),
//! ));
//! let preferences = Arc::new(InMemoryPreferencesStore::new());
//!
//! let ctx = PlannerContext::new(router.clone(), memory.clone(), sessions, preferences.clone());
//! let pipeline = Arc::new(PlanPipeline::new(ctx));
//! let registry = Arc::new(AgentRegistry::with_builtins(router, memory, preferences));
//!
//! let report = Orchestrator::new(pipeline, registry)
//!     .run("Build a todo app")
//!     .await?;
//! println!("{} tasks planned", report.plan.len());
//! # Ok(())
//! # }
//! ```

pub use trellis_agent as agent;
pub use trellis_core as core;
pub use trellis_graph as graph;
pub use trellis_memory as memory;
pub use trellis_model as model;
pub use trellis_runner as runner;
pub use trellis_session as session;

pub use trellis_core::{Result, TrellisError};

/// The names most programs need, in one import.
pub mod prelude {
    pub use trellis_agent::{
        AgentInput, AgentRegistry, AuxiliaryAgent, Audience, DraftedMessage, LiaisonAgent,
        MessageType, Tone,
    };
    pub use trellis_core::{
        ChatMessage, ChatProvider, ChatRole, Priority, Result, Sprint, SubTask, Task,
        TrellisError,
    };
    pub use trellis_graph::{ClarifyOutcome, PlanPipeline, PlanState, PlannerContext};
    pub use trellis_memory::{InMemoryPlanHistory, InMemorySink, MemorySink, PlanHistoryService};
    pub use trellis_model::{
        CircuitBreaker, CircuitBreakerConfig, MockChat, ProviderRouter, RetryPolicy,
    };
    pub use trellis_runner::{Orchestrator, OrchestratorReport};
    pub use trellis_session::{
        InMemoryPreferencesStore, InMemorySessionStore, PreferencesStore, SessionManager,
        SessionStore, UserPreferences,
    };
}

/// Installs a `fmt` subscriber honoring `RUST_LOG`. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
