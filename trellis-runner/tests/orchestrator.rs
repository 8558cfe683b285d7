use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use trellis_agent::{AgentInput, AgentRegistry, AuxiliaryAgent};
use trellis_core::{Priority, Result, TrellisError};
use trellis_graph::{PlanPipeline, PlannerContext};
use trellis_memory::{InMemoryPlanHistory, InMemorySink};
use trellis_model::{MockChat, ProviderRouter};
use trellis_runner::Orchestrator;
use trellis_session::{InMemoryPreferencesStore, InMemorySessionStore, SessionManager};

const PLAN_REPLY: &str = r#"[
    {"id":"t1","title":"Design schema","detail":"Sketch the data model","priority":"P1","estimate_h":4},
    {"id":"t2","title":"Build API","detail":"CRUD endpoints","priority":"P1","estimate_h":8},
    {"id":"t3","title":"Write tests","detail":"Cover the endpoints","priority":"P2","estimate_h":4},
    {"id":"t4","title":"Deploy","detail":"Ship to staging","priority":"P2","estimate_h":2}
]"#;

const LIAISON_REPLY: &str = r#"{"subject":"Plan ready","message":"The todo app plan is ready; four tasks are queued for the first sprint.","tone":"professional"}"#;

struct Stack {
    orchestrator: Orchestrator,
    chat: Arc<MockChat>,
    registry: Arc<AgentRegistry>,
    pipeline: Arc<PlanPipeline>,
}

fn stack(replies: &[&str]) -> Stack {
    let mut mock = MockChat::new("mock");
    for reply in replies {
        mock = mock.with_response(*reply);
    }
    let chat = Arc::new(mock);
    let router = Arc::new(ProviderRouter::new("mock").register_instance("mock", chat.clone()));

    let memory = Arc::new(InMemorySink::new());
    let sessions = Arc::new(SessionManager::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryPlanHistory::new()),
    ));
    let preferences = Arc::new(InMemoryPreferencesStore::new());

    let ctx = PlannerContext::new(
        router.clone(),
        memory.clone(),
        sessions,
        preferences.clone(),
    );
    let pipeline = Arc::new(PlanPipeline::new(ctx));
    let registry = Arc::new(AgentRegistry::with_builtins(router, memory, preferences));

    Stack {
        orchestrator: Orchestrator::new(pipeline.clone(), registry.clone()),
        chat,
        registry,
        pipeline,
    }
}

struct FailingAgent;

#[async_trait]
impl AuxiliaryAgent for FailingAgent {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _input: &AgentInput) -> Result<Value> {
        Err(TrellisError::Service("agent blew up".into()))
    }
}

struct SlowAgent;

#[async_trait]
impl AuxiliaryAgent for SlowAgent {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, _input: &AgentInput) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn run_plans_then_fans_out_all_agents() {
    let s = stack(&[PLAN_REPLY, LIAISON_REPLY]);

    let report = s.orchestrator.run("Build a todo app").await.unwrap();

    // One planning call plus one liaison call; no other agent hits the provider.
    assert_eq!(s.chat.call_count(), 2);
    assert_eq!(report.plan.len(), 4);
    assert_eq!(report.plan[0].priority, Priority::P1);

    assert_eq!(report.metadata.agents_attempted, 6);
    assert_eq!(report.metadata.agents_succeeded, 6);
    assert_eq!(report.metadata.agents_failed, 0);

    // Chronos schedules 4 tasks plus one break after the third.
    let schedule = report.schedule.as_ref().unwrap();
    assert_eq!(schedule.as_array().unwrap().len(), 5);
    assert_eq!(report.agents.get("chronos").unwrap(), &report.schedule);

    let guardian = report.agents["guardian"].as_ref().unwrap();
    assert_eq!(guardian.as_array().unwrap().len(), 2);

    let liaison = report.agents["liaison"].as_ref().unwrap();
    assert_eq!(liaison["generation_method"], "llm");
}

#[tokio::test]
async fn planning_failure_aborts_the_run() {
    let s = stack(&["not json at all"]);
    let err = s.orchestrator.run("Build a todo app").await.unwrap_err();
    assert!(matches!(err, TrellisError::InvalidResponse(_)));
}

#[tokio::test]
async fn failed_agent_leaves_a_none_slot() {
    let s = stack(&[PLAN_REPLY]);
    s.registry.register_instance("failing", Arc::new(FailingAgent));

    let orchestrator = Orchestrator::new(s.pipeline.clone(), s.registry.clone())
        .with_agents(vec!["failing".to_string(), "mentor".to_string()]);
    let report = orchestrator.run("Build a todo app").await.unwrap();

    assert_eq!(report.agents["failing"], None);
    assert!(report.agents["mentor"].is_some());
    assert_eq!(report.metadata.agents_failed, 1);
    assert_eq!(report.metadata.agents_succeeded, 1);
}

#[tokio::test]
async fn slow_agent_times_out_without_stalling_the_run() {
    let s = stack(&[PLAN_REPLY]);
    s.registry.register_instance("slow", Arc::new(SlowAgent));

    let orchestrator = Orchestrator::new(s.pipeline.clone(), s.registry.clone())
        .with_agents(vec!["slow".to_string(), "guardian".to_string()])
        .with_agent_timeout(Duration::from_millis(20));
    let report = orchestrator.run("Build a todo app").await.unwrap();

    assert_eq!(report.agents["slow"], None);
    assert!(report.agents["guardian"].is_some());
}

#[tokio::test]
async fn unknown_agents_are_skipped_not_failed() {
    let s = stack(&[PLAN_REPLY]);
    let orchestrator = Orchestrator::new(s.pipeline.clone(), s.registry.clone())
        .with_agents(vec!["mentor".to_string(), "ghost".to_string()]);

    let report = orchestrator.run("Build a todo app").await.unwrap();
    assert_eq!(report.metadata.agents_attempted, 1);
    assert!(!report.agents.contains_key("ghost"));
}
