use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tracing::{debug, error, info, warn};
use trellis_agent::{AgentInput, AgentRegistry};
use trellis_core::Result;
use trellis_graph::PlanPipeline;
use trellis_model::with_timeout;

/// Agents fanned out after planning, in launch order.
pub const FAN_OUT: &[&str] = &[
    "chronos",
    "guardian",
    "mentor",
    "scribe",
    "liaison",
    "focusbuddy",
];

const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PLANNER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub goal: String,
    pub agents_attempted: usize,
    pub agents_succeeded: usize,
    pub agents_failed: usize,
}

/// Outcome of one orchestrated run. A `None` agent slot means that agent
/// failed or timed out; the rest of the report is still valid.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorReport {
    pub plan: Vec<trellis_core::Task>,
    pub agents: HashMap<String, Option<Value>>,
    /// Alias for the chronos output, kept at the top level.
    pub schedule: Option<Value>,
    pub metadata: RunMetadata,
}

/// Plans once, then runs the auxiliary agents concurrently over the result.
///
/// Planning failure aborts the run; agent failures are isolated per slot.
pub struct Orchestrator {
    pipeline: Arc<PlanPipeline>,
    registry: Arc<AgentRegistry>,
    agents: Vec<String>,
    agent_timeout: Duration,
    planner_timeout: Duration,
}

impl Orchestrator {
    pub fn new(pipeline: Arc<PlanPipeline>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            pipeline,
            registry,
            agents: FAN_OUT.iter().map(|name| name.to_string()).collect(),
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            planner_timeout: DEFAULT_PLANNER_TIMEOUT,
        }
    }

    /// Replaces the fan-out list. Unknown names are skipped at run time.
    #[must_use]
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }

    #[must_use]
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_planner_timeout(mut self, timeout: Duration) -> Self {
        self.planner_timeout = timeout;
        self
    }

    pub async fn run(&self, goal: &str) -> Result<OrchestratorReport> {
        let tasks = with_timeout(
            "orchestrator_plan",
            self.planner_timeout,
            self.pipeline.plan_tasks(goal),
        )
        .await
        .inspect_err(|err| error!(error = %err, "planning failed, run aborted"))?;

        info!(tasks = tasks.len(), "plan ready, fanning out agents");
        let input = AgentInput::new(goal, tasks.clone());

        let mut launches = Vec::new();
        for name in &self.agents {
            match self.registry.get(name) {
                Ok(agent) => launches.push((name.clone(), agent)),
                Err(_) => debug!(agent = %name, "not registered, skipped"),
            }
        }
        let attempted = launches.len();

        let agent_timeout = self.agent_timeout;
        let futures = launches.into_iter().map(|(name, agent)| {
            let input = input.clone();
            async move {
                let result = with_timeout(&name, agent_timeout, agent.run(&input)).await;
                (name, result)
            }
        });
        let results = join_all(futures).await;

        let mut agents = HashMap::new();
        let mut succeeded = 0;
        let mut failed = 0;
        for (name, result) in results {
            match result {
                Ok(value) => {
                    succeeded += 1;
                    agents.insert(name, Some(value));
                }
                Err(err) => {
                    warn!(agent = %name, error = %err, "agent failed, continuing without it");
                    failed += 1;
                    agents.insert(name, None);
                }
            }
        }

        let schedule = agents.get("chronos").cloned().flatten();
        Ok(OrchestratorReport {
            plan: tasks,
            agents,
            schedule,
            metadata: RunMetadata {
                goal: goal.to_string(),
                agents_attempted: attempted,
                agents_succeeded: succeeded,
                agents_failed: failed,
            },
        })
    }
}
