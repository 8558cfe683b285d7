use serde::{Deserialize, Serialize};
use trellis_core::{Sprint, Task};

/// Mutable record threaded through the pipeline.
///
/// Owned exclusively by the single in-flight run; stages read it and return
/// a [`StageUpdate`] rather than mutating it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    pub goal: String,
    pub original_goal: Option<String>,
    pub tasks: Vec<Task>,
    pub sprints: Vec<Sprint>,
    pub session_id: Option<String>,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
}

impl PlanState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            original_goal: None,
            tasks: Vec::new(),
            sprints: Vec::new(),
            session_id: None,
            needs_clarification: false,
            clarification_questions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Merges a stage's output: only fields the stage produced change.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(goal) = update.goal {
            self.goal = goal;
        }
        if let Some(original_goal) = update.original_goal {
            self.original_goal = Some(original_goal);
        }
        if let Some(tasks) = update.tasks {
            self.tasks = tasks;
        }
        if let Some(sprints) = update.sprints {
            self.sprints = sprints;
        }
        if let Some(needs_clarification) = update.needs_clarification {
            self.needs_clarification = needs_clarification;
        }
        if let Some(questions) = update.clarification_questions {
            self.clarification_questions = questions;
        }
    }
}

/// Partial output of one stage. `None` fields leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    pub goal: Option<String>,
    pub original_goal: Option<String>,
    pub tasks: Option<Vec<Task>>,
    pub sprints: Option<Vec<Sprint>>,
    pub needs_clarification: Option<bool>,
    pub clarification_questions: Option<Vec<String>>,
}

impl StageUpdate {
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    #[must_use]
    pub fn with_original_goal(mut self, original_goal: impl Into<String>) -> Self {
        self.original_goal = Some(original_goal.into());
        self
    }

    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    #[must_use]
    pub fn with_sprints(mut self, sprints: Vec<Sprint>) -> Self {
        self.sprints = Some(sprints);
        self
    }

    #[must_use]
    pub fn with_clarification(mut self, needed: bool, questions: Vec<String>) -> Self {
        self.needs_clarification = Some(needed);
        self.clarification_questions = Some(questions);
        self
    }
}

/// Result of starting an interactive run.
#[derive(Debug, Clone)]
pub enum ClarifyOutcome {
    /// The goal was too vague; answer the questions and continue the session.
    NeedsClarification { questions: Vec<String> },
    /// The goal was clear enough and the full pipeline already ran.
    Planned(PlanState),
}
