use crate::context::PlannerContext;
use crate::parse;
use crate::prompts;
use crate::stage::Stage;
use crate::stages::{
    ClarifyStage, EstimateStage, IntegrateStage, PackageStage, PlanStage, PrioritizeStage,
};
use crate::state::{ClarifyOutcome, PlanState, StageUpdate};
use tracing::debug;
use trellis_core::{ChatMessage, Result, SubTask, Task, TrellisError};
use trellis_session::MessageRole;

/// The plan → prioritize → estimate → package pipeline.
///
/// Stages run strictly in order by direct invocation; the optional
/// clarify/integrate stages wrap the same core sequence for interactive use.
pub struct PlanPipeline {
    ctx: PlannerContext,
}

impl PlanPipeline {
    pub fn new(ctx: PlannerContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &PlannerContext {
        &self.ctx
    }

    fn core_stages(&self) -> Vec<Box<dyn Stage>> {
        vec![
            Box::new(PlanStage::new(self.ctx.clone())),
            Box::new(PrioritizeStage::new(self.ctx.clone())),
            Box::new(EstimateStage::new(self.ctx.clone())),
            Box::new(PackageStage::new(self.ctx.clone())),
        ]
    }

    /// One-shot planning: goal in, sprints out, no dialogue.
    pub async fn run(&self, goal: impl Into<String>) -> Result<PlanState> {
        self.run_with_state(PlanState::new(goal)).await
    }

    async fn apply_stage(&self, stage: &dyn Stage, state: &mut PlanState) -> Result<()> {
        debug!(stage = stage.name(), "running planning stage");
        let update = stage.run(state).await?;
        state.apply(update);
        Ok(())
    }

    pub async fn run_with_state(&self, mut state: PlanState) -> Result<PlanState> {
        for stage in self.core_stages() {
            self.apply_stage(stage.as_ref(), &mut state).await?;
        }
        Ok(state)
    }

    /// Runs only the plan stage. Used by the orchestrator, which wants the
    /// task list without sprint packaging.
    pub async fn plan_tasks(&self, goal: impl Into<String>) -> Result<Vec<Task>> {
        let mut state = PlanState::new(goal);
        self.apply_stage(&PlanStage::new(self.ctx.clone()), &mut state)
            .await?;
        Ok(state.tasks)
    }

    /// Starts an interactive run: opens a session and asks the clarify stage
    /// whether the goal is plannable as-is. Returns the session id alongside
    /// the outcome so callers can continue the dialogue.
    pub async fn start_interactive(
        &self,
        goal: impl Into<String>,
    ) -> Result<(String, ClarifyOutcome)> {
        let goal = goal.into();
        let session = self.ctx.sessions.create_session(goal.clone()).await?;
        let session_id = session.session_id;

        let mut state = PlanState::new(goal).with_session(&session_id);
        self.apply_stage(&ClarifyStage::new(self.ctx.clone()), &mut state)
            .await?;

        if state.needs_clarification {
            let questions = state.clarification_questions.clone();
            return Ok((session_id, ClarifyOutcome::NeedsClarification { questions }));
        }
        let state = self.run_with_state(state).await?;
        Ok((session_id, ClarifyOutcome::Planned(state)))
    }

    /// Feeds a user answer into an open session and re-runs clarify. Once no
    /// further questions remain (or the round budget is spent), the answers
    /// are integrated into an enriched goal and the core pipeline runs.
    pub async fn continue_interactive(
        &self,
        session_id: &str,
        answer: &str,
    ) -> Result<ClarifyOutcome> {
        let session = self
            .ctx
            .sessions
            .update_session(session_id, MessageRole::User, answer)
            .await?
            .ok_or_else(|| {
                TrellisError::Session(format!("unknown or expired session '{session_id}'"))
            })?;

        let mut state = PlanState::new(session.goal).with_session(session_id);
        self.apply_stage(&ClarifyStage::new(self.ctx.clone()), &mut state)
            .await?;

        if state.needs_clarification {
            let questions = state.clarification_questions.clone();
            return Ok(ClarifyOutcome::NeedsClarification { questions });
        }

        self.apply_stage(&IntegrateStage::new(self.ctx.clone()), &mut state)
            .await?;
        Ok(ClarifyOutcome::Planned(self.run_with_state(state).await?))
    }

    /// Breaks one task into ordered subtasks.
    pub async fn breakdown_task(&self, task: &Task) -> Result<Vec<SubTask>> {
        let prompt = prompts::breakdown_prompt(task);
        let content = self
            .ctx
            .provider
            .chat(&[ChatMessage::user(prompt)], None)
            .await?;
        parse::parse_subtasks(&content)
    }

    /// Merges an externally produced update, for callers that drive stages
    /// themselves.
    pub fn merge(state: &mut PlanState, update: StageUpdate) {
        state.apply(update);
    }
}
