use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub task: String,
    pub start: String,
    pub end: String,
}

/// Deterministic day scheduler: hourly blocks from 09:00, with a five-minute
/// break after every third task.
pub struct ChronosAgent;

impl ChronosAgent {
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn create_schedule(&self, input: &AgentInput) -> Vec<ScheduleBlock> {
        let mut schedule = Vec::new();
        let mut current = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();

        for (index, task) in input.tasks.iter().enumerate() {
            let end = current + Duration::hours(1);
            schedule.push(ScheduleBlock {
                task: task.title.clone(),
                start: current.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
            current = end;

            if (index + 1) % 3 == 0 {
                let break_end = current + Duration::minutes(5);
                schedule.push(ScheduleBlock {
                    task: "Break".to_string(),
                    start: current.format("%H:%M").to_string(),
                    end: break_end.format("%H:%M").to_string(),
                });
                current = break_end;
            }
        }

        schedule
    }
}

impl Default for ChronosAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuxiliaryAgent for ChronosAgent {
    fn name(&self) -> &str {
        "chronos"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        Ok(serde_json::to_value(self.create_schedule(input))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Priority, Task};

    fn input(n: usize) -> AgentInput {
        let tasks = (0..n)
            .map(|i| Task::new(format!("task {i}"), "d", Priority::P1, 1).unwrap())
            .collect();
        AgentInput::new("goal", tasks)
    }

    #[test]
    fn schedules_hourly_blocks_from_nine() {
        let schedule = ChronosAgent::new().create_schedule(&input(2));
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].start, "09:00");
        assert_eq!(schedule[0].end, "10:00");
        assert_eq!(schedule[1].start, "10:00");
    }

    #[test]
    fn inserts_break_after_every_third_task() {
        let schedule = ChronosAgent::new().create_schedule(&input(4));
        // 3 tasks, break, 4th task
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule[3].task, "Break");
        assert_eq!(schedule[3].start, "12:00");
        assert_eq!(schedule[3].end, "12:05");
        assert_eq!(schedule[4].start, "12:05");
    }

    #[test]
    fn empty_task_list_yields_empty_schedule() {
        assert!(ChronosAgent::new().create_schedule(&input(0)).is_empty());
    }
}
