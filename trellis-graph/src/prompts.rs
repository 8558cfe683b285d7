//! Prompt construction for the planning stages.

use trellis_core::Task;
use trellis_memory::PlanHistory;
use trellis_session::{MessageRole, SessionMessage, UserPreferences};

pub const MAX_CLARIFICATION_QUESTIONS: usize = 3;

pub fn plan_prompt(goal: &str, prefs: &UserPreferences, history: &[PlanHistory]) -> String {
    let mut prompt = format!(
        "You are Trellis-Planner.\n\n\
         Transform the user goal into detailed Tasks.\nGoal: {goal}\n\n\
         USER PREFERENCES: {}\n",
        prefs.to_prompt_context()
    );

    if !history.is_empty() {
        prompt.push_str("\nFor context, similar past projects:\n");
        for record in history {
            prompt.push_str(&format!("  - {}\n", record.goal));
        }
    }

    prompt.push_str(
        "\nReturn JSON list[Task] with fields (id, title, detail, priority, estimate_h).",
    );
    prompt
}

pub fn prioritize_prompt(tasks_json: &str) -> String {
    format!("Assign priority levels P0-P3.\n\nTasks JSON:\n{tasks_json}\nReturn updated list.")
}

pub fn estimate_prompt(tasks_json: &str) -> String {
    format!(
        "Insert realistic integer `estimate_h` for each task (developer hours, 1-100).\n\n\
         Tasks:\n{tasks_json}"
    )
}

pub fn package_prompt(tasks_json: &str, prefs: &UserPreferences) -> String {
    format!(
        "Group tasks into {}-week sprints ordered chronologically.\n\
         Each sprint needs name, start, end, tasks.\n\n\
         USER PREFERENCES: {}\n\nTasks:\n{tasks_json}",
        prefs.sprint_length_weeks,
        prefs.to_prompt_context()
    )
}

pub fn clarify_prompt(goal: &str, context: &[SessionMessage]) -> String {
    let mut prompt = format!(
        "You are Trellis-Planner deciding whether a goal is concrete enough to plan.\n\n\
         Goal: {goal}\n"
    );

    if !context.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for msg in context {
            prompt.push_str(&format!("  {}: {}\n", role_label(msg.role), msg.content));
        }
    }

    prompt.push_str(&format!(
        "\nIf the goal is missing information needed to plan (platform, scope, timeline), \
         ask for it. Return JSON {{\"needs_clarification\": bool, \"questions\": [string]}} \
         with at most {MAX_CLARIFICATION_QUESTIONS} questions."
    ));
    prompt
}

pub fn integrate_prompt(original_goal: &str, context: &[SessionMessage]) -> String {
    let mut prompt = format!(
        "Rewrite the goal below into a single enriched goal statement that folds in \
         the user's clarification answers.\n\nOriginal goal: {original_goal}\n\n\
         Clarification dialogue:\n"
    );
    for msg in context {
        prompt.push_str(&format!("  {}: {}\n", role_label(msg.role), msg.content));
    }
    prompt.push_str("\nReturn only the enriched goal text, no commentary.");
    prompt
}

pub fn breakdown_prompt(task: &Task) -> String {
    format!(
        "Break the task below into ordered subtasks.\n\n\
         Title: {}\nDetail: {}\nEstimate: {}h\n\n\
         Return JSON list[SubTask] with fields (title, detail, estimate_h, order).",
        task.title, task.detail, task.estimate_h
    )
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_memory::PlanHistory;

    #[test]
    fn plan_prompt_reflects_preferences_and_history() {
        let mut prefs = UserPreferences::default();
        prefs.sprint_length_weeks = 1;
        prefs.tone = "casual".to_string();
        let history = vec![PlanHistory::new("Build a web app", vec![], None)];

        let prompt = plan_prompt("Build an iOS app", &prefs, &history);
        assert!(prompt.contains("sprint length: 1 weeks"));
        assert!(prompt.contains("preferred tone: casual"));
        assert!(prompt.contains("similar past projects"));
        assert!(prompt.contains("Build a web app"));
    }

    #[test]
    fn package_prompt_uses_preference_rendering() {
        let mut prefs = UserPreferences::default();
        prefs.sprint_length_weeks = 3;

        let prompt = package_prompt("[]", &prefs);
        assert!(prompt.contains("3-week sprints"));
        assert!(prompt.contains("sprint length: 3 weeks"));
    }

    #[test]
    fn plan_prompt_omits_history_section_when_empty() {
        let prompt = plan_prompt("goal", &UserPreferences::default(), &[]);
        assert!(!prompt.contains("similar past projects"));
    }

    #[test]
    fn clarify_prompt_bounds_question_count() {
        let prompt = clarify_prompt("Build an app", &[]);
        assert!(prompt.contains("at most 3 questions"));
    }
}
