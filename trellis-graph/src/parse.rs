//! Tolerant extraction of structured payloads from model output.
//!
//! Providers frequently wrap JSON in prose or code fences; these helpers
//! slice out the outermost JSON value and report anything unparseable as
//! [`TrellisError::InvalidResponse`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use trellis_core::{Result, Sprint, SubTask, Task, TrellisError};

/// The model's clarify verdict.
#[derive(Debug, Deserialize)]
pub struct ClarifyDecision {
    pub needs_clarification: bool,
    #[serde(default)]
    pub questions: Vec<String>,
}

fn extract_delimited<'a>(text: &'a str, open: char, close: char) -> Option<&'a str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Outermost `[...]` slice of `text`.
pub fn extract_json_array(text: &str) -> Result<&str> {
    extract_delimited(text, '[', ']').ok_or_else(|| {
        TrellisError::InvalidResponse(format!(
            "no JSON array found in response: {}",
            preview(text)
        ))
    })
}

/// Outermost `{...}` slice of `text`.
pub fn extract_json_object(text: &str) -> Result<&str> {
    extract_delimited(text, '{', '}').ok_or_else(|| {
        TrellisError::InvalidResponse(format!(
            "no JSON object found in response: {}",
            preview(text)
        ))
    })
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    trimmed.chars().take(120).collect()
}

fn parse_array<T: DeserializeOwned>(text: &str, what: &str) -> Result<Vec<T>> {
    let slice = extract_json_array(text)?;
    serde_json::from_str(slice).map_err(|err| {
        TrellisError::InvalidResponse(format!("could not parse {what}: {err}"))
    })
}

pub fn parse_tasks(text: &str) -> Result<Vec<Task>> {
    parse_array(text, "task list")
}

pub fn parse_sprints(text: &str) -> Result<Vec<Sprint>> {
    parse_array(text, "sprint list")
}

pub fn parse_subtasks(text: &str) -> Result<Vec<SubTask>> {
    parse_array(text, "subtask list")
}

pub fn parse_clarify_decision(text: &str) -> Result<ClarifyDecision> {
    let slice = extract_json_object(text)?;
    serde_json::from_str(slice).map_err(|err| {
        TrellisError::InvalidResponse(format!("could not parse clarify decision: {err}"))
    })
}
