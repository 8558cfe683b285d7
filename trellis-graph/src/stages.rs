//! The LLM-backed pipeline stages.

use crate::context::PlannerContext;
use crate::parse;
use crate::prompts::{self, MAX_CLARIFICATION_QUESTIONS};
use crate::stage::Stage;
use crate::state::{PlanState, StageUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};
use trellis_core::{ChatMessage, Result, Task, TrellisError};
use trellis_session::MessageRole;

/// User answers beyond this many rounds stop producing new questions.
pub const MAX_CLARIFICATION_ROUNDS: u32 = 3;

fn tasks_json(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string(tasks)?)
}

/// Rejects a response that dropped, duplicated or invented task ids.
fn ensure_task_identity(stage: &str, before: &[Task], after: &[Task]) -> Result<()> {
    if before.len() != after.len() {
        return Err(TrellisError::InvalidResponse(format!(
            "{stage} returned {} tasks, expected {}",
            after.len(),
            before.len()
        )));
    }

    let mut expected: HashMap<&str, usize> = HashMap::new();
    for task in before {
        *expected.entry(task.id.as_str()).or_insert(0) += 1;
    }
    for task in after {
        match expected.get_mut(task.id.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                return Err(TrellisError::InvalidResponse(format!(
                    "{stage} returned unknown or duplicated task id '{}'",
                    task.id
                )));
            }
        }
    }
    Ok(())
}

fn goal_of(state: &PlanState) -> Result<&str> {
    let goal = state.goal.trim();
    if goal.is_empty() {
        return Err(TrellisError::Validation("planning state has no goal".into()));
    }
    Ok(goal)
}

/// Turns the goal into an initial task list.
pub struct PlanStage {
    ctx: PlannerContext,
}

impl PlanStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for PlanStage {
    fn name(&self) -> &'static str {
        "plan"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let goal = goal_of(state)?;
        let prefs = self.ctx.load_preferences().await;
        let history = self.ctx.sessions.relevant_history(goal, 3).await;

        let prompt = prompts::plan_prompt(goal, &prefs, &history);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        let tasks = parse::parse_tasks(&content)?;

        self.ctx.remember("planner", tasks_json(&tasks)?).await;
        Ok(StageUpdate::default().with_tasks(tasks))
    }
}

/// Reassigns P0-P3 priorities over the existing tasks.
pub struct PrioritizeStage {
    ctx: PlannerContext,
}

impl PrioritizeStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for PrioritizeStage {
    fn name(&self) -> &'static str {
        "prioritize"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let prompt = prompts::prioritize_prompt(&tasks_json(&state.tasks)?);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        let tasks = parse::parse_tasks(&content)?;
        ensure_task_identity(self.name(), &state.tasks, &tasks)?;
        Ok(StageUpdate::default().with_tasks(tasks))
    }
}

/// Fills in hour estimates for the existing tasks.
pub struct EstimateStage {
    ctx: PlannerContext,
}

impl EstimateStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for EstimateStage {
    fn name(&self) -> &'static str {
        "estimate"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let prompt = prompts::estimate_prompt(&tasks_json(&state.tasks)?);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        let tasks = parse::parse_tasks(&content)?;
        ensure_task_identity(self.name(), &state.tasks, &tasks)?;
        Ok(StageUpdate::default().with_tasks(tasks))
    }
}

/// Groups the estimated tasks into dated sprints and closes the session.
pub struct PackageStage {
    ctx: PlannerContext,
}

impl PackageStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for PackageStage {
    fn name(&self) -> &'static str {
        "package"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let prefs = self.ctx.load_preferences().await;
        let prompt = prompts::package_prompt(&tasks_json(&state.tasks)?, &prefs);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        let sprints = parse::parse_sprints(&content)?;

        self.ctx
            .remember("packager", serde_json::to_string(&sprints)?)
            .await;

        if let Some(session_id) = &state.session_id {
            if let Err(err) = self
                .ctx
                .sessions
                .complete_session(session_id, Some(sprints.clone()))
                .await
            {
                warn!(session_id = %session_id, error = %err, "session completion failed");
            }
        }

        Ok(StageUpdate::default().with_sprints(sprints))
    }
}

/// Decides whether the goal needs clarifying questions before planning.
pub struct ClarifyStage {
    ctx: PlannerContext,
}

impl ClarifyStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for ClarifyStage {
    fn name(&self) -> &'static str {
        "clarify"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let goal = goal_of(state)?;

        let mut context_messages = Vec::new();
        if let Some(session_id) = &state.session_id {
            if let Some(session) = self.ctx.sessions.get_session(session_id).await? {
                if session.clarification_count >= MAX_CLARIFICATION_ROUNDS {
                    info!(
                        session_id = %session_id,
                        rounds = session.clarification_count,
                        "clarification budget exhausted, planning with what we have"
                    );
                    return Ok(StageUpdate::default().with_clarification(false, Vec::new()));
                }
                context_messages = session.context(10).to_vec();
            }
        }

        let prompt = prompts::clarify_prompt(goal, &context_messages);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        let mut decision = parse::parse_clarify_decision(&content)?;
        decision.questions.truncate(MAX_CLARIFICATION_QUESTIONS);
        if !decision.needs_clarification {
            decision.questions.clear();
        }

        if decision.needs_clarification {
            if let Some(session_id) = &state.session_id {
                self.ctx
                    .sessions
                    .update_session(
                        session_id,
                        MessageRole::Assistant,
                        decision.questions.join("\n"),
                    )
                    .await?;
            }
        }

        Ok(StageUpdate::default()
            .with_clarification(decision.needs_clarification, decision.questions))
    }
}

/// Folds clarification answers into a single enriched goal.
pub struct IntegrateStage {
    ctx: PlannerContext,
}

impl IntegrateStage {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Stage for IntegrateStage {
    fn name(&self) -> &'static str {
        "integrate"
    }

    async fn run(&self, state: &PlanState) -> Result<StageUpdate> {
        let session_id = state.session_id.as_deref().ok_or_else(|| {
            TrellisError::Session("integration requires an active session".into())
        })?;
        let session = self
            .ctx
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| {
                TrellisError::Session(format!("unknown or expired session '{session_id}'"))
            })?;

        let prompt = prompts::integrate_prompt(&session.goal, session.context(20));
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;

        let enriched = content.trim();
        if enriched.is_empty() {
            return Err(TrellisError::EmptyResponse(
                "integration produced no goal text".into(),
            ));
        }

        Ok(StageUpdate::default()
            .with_goal(enriched)
            .with_original_goal(session.goal))
    }
}
