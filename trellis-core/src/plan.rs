use crate::{Result, TrellisError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DETAIL_CHARS: usize = 5000;
pub const MAX_SPRINT_NAME_CHARS: usize = 100;
pub const MAX_ESTIMATE_HOURS: u32 = 1000;

/// Task priority, highest first. `P0` sorts before `P3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

/// A single unit of work in a plan.
///
/// Instances are only constructed through [`Task::new`] or deserialization,
/// both of which enforce the field invariants, so holding a `Task` means
/// holding a valid one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TaskDraft")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub priority: Priority,
    pub estimate_h: u32,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize)]
struct TaskDraft {
    #[serde(default)]
    id: Option<String>,
    title: String,
    detail: String,
    priority: Priority,
    estimate_h: u32,
    #[serde(default)]
    done: bool,
}

impl TryFrom<TaskDraft> for Task {
    type Error = TrellisError;

    fn try_from(draft: TaskDraft) -> Result<Self> {
        let mut task = Task::new(draft.title, draft.detail, draft.priority, draft.estimate_h)?;
        if let Some(id) = draft.id {
            let id = id.trim().to_string();
            if !id.is_empty() {
                task.id = id;
            }
        }
        task.done = draft.done;
        Ok(task)
    }
}

impl Task {
    /// Creates a validated task with a fresh short id.
    pub fn new(
        title: impl Into<String>,
        detail: impl Into<String>,
        priority: Priority,
        estimate_h: u32,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        let detail = detail.into().trim().to_string();

        if title.is_empty() {
            return Err(TrellisError::Validation("task title must not be empty".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(TrellisError::Validation(format!(
                "task title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        if detail.is_empty() {
            return Err(TrellisError::Validation("task detail must not be empty".into()));
        }
        if detail.chars().count() > MAX_DETAIL_CHARS {
            return Err(TrellisError::Validation(format!(
                "task detail exceeds {MAX_DETAIL_CHARS} characters"
            )));
        }
        if estimate_h < 1 || estimate_h > MAX_ESTIMATE_HOURS {
            return Err(TrellisError::Validation(format!(
                "task estimate must be between 1 and {MAX_ESTIMATE_HOURS} hours, got {estimate_h}"
            )));
        }

        Ok(Self { id: short_id(), title, detail, priority, estimate_h, done: false })
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Short opaque identifier, unique enough for within-plan references.
fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// A named, dated grouping of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SprintDraft")]
pub struct Sprint {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct SprintDraft {
    name: String,
    start: NaiveDate,
    end: NaiveDate,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl TryFrom<SprintDraft> for Sprint {
    type Error = TrellisError;

    fn try_from(draft: SprintDraft) -> Result<Self> {
        Sprint::new(draft.name, draft.start, draft.end, draft.tasks)
    }
}

impl Sprint {
    pub fn new(
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        tasks: Vec<Task>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();

        if name.is_empty() {
            return Err(TrellisError::Validation("sprint name must not be empty".into()));
        }
        if name.chars().count() > MAX_SPRINT_NAME_CHARS {
            return Err(TrellisError::Validation(format!(
                "sprint name exceeds {MAX_SPRINT_NAME_CHARS} characters"
            )));
        }
        if start >= end {
            return Err(TrellisError::Validation(format!(
                "sprint start {start} must be before end {end}"
            )));
        }

        Ok(Self { name, start, end, tasks })
    }

    /// Total estimated hours across the sprint's tasks.
    #[must_use]
    pub fn total_estimate_h(&self) -> u32 {
        self.tasks.iter().map(|t| t.estimate_h).sum()
    }
}

/// A fine-grained step produced by breaking a task down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SubTaskDraft")]
pub struct SubTask {
    pub title: String,
    #[serde(default)]
    pub detail: String,
    pub estimate_h: u32,
    pub order: u32,
}

#[derive(Deserialize)]
struct SubTaskDraft {
    title: String,
    #[serde(default)]
    detail: String,
    estimate_h: u32,
    order: u32,
}

impl TryFrom<SubTaskDraft> for SubTask {
    type Error = TrellisError;

    fn try_from(draft: SubTaskDraft) -> Result<Self> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(TrellisError::Validation("subtask title must not be empty".into()));
        }
        if draft.estimate_h < 1 || draft.estimate_h > MAX_ESTIMATE_HOURS {
            return Err(TrellisError::Validation(format!(
                "subtask estimate must be between 1 and {MAX_ESTIMATE_HOURS} hours, got {}",
                draft.estimate_h
            )));
        }
        Ok(Self {
            title,
            detail: draft.detail.trim().to_string(),
            estimate_h: draft.estimate_h,
            order: draft.order,
        })
    }
}
