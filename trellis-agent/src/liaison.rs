//! The liaison drafts outward-facing messages about the plan.
//!
//! Generation prefers the LLM (bounded by retry and timeout policies) and
//! degrades to static templates, so the agent always returns something
//! usable even during a provider outage.

use crate::{AgentInput, AuxiliaryAgent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use trellis_core::{ChatMessage, Result, TrellisError};
use trellis_memory::{MemoryEntry, MemorySink};
use trellis_model::{ProviderRouter, RetryPolicy, with_retry, with_timeout};
use trellis_session::{PreferencesStore, UserPreferences};

pub const MAX_GOAL_CHARS: usize = 500;
const MIN_MESSAGE_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StatusUpdate,
    Proposal,
    Progress,
    HelpRequest,
    Delegation,
}

impl MessageType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::StatusUpdate => "status_update",
            MessageType::Proposal => "proposal",
            MessageType::Progress => "progress",
            MessageType::HelpRequest => "help_request",
            MessageType::Delegation => "delegation",
        }
    }
}

impl FromStr for MessageType {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "status_update" => Ok(MessageType::StatusUpdate),
            "proposal" => Ok(MessageType::Proposal),
            "progress" => Ok(MessageType::Progress),
            "help_request" => Ok(MessageType::HelpRequest),
            "delegation" => Ok(MessageType::Delegation),
            other => Err(validation(format!(
                "Invalid message_type '{other}'. Must be one of: status_update, proposal, \
                 progress, help_request, delegation"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Direct,
}

impl Tone {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Direct => "direct",
        }
    }
}

impl FromStr for Tone {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "direct" => Ok(Tone::Direct),
            other => Err(validation(format!(
                "Invalid tone '{other}'. Must be one of: professional, casual, direct"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Manager,
    Teammate,
    Client,
    Public,
}

impl Audience {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Manager => "manager",
            Audience::Teammate => "teammate",
            Audience::Client => "client",
            Audience::Public => "public",
        }
    }
}

impl FromStr for Audience {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manager" => Ok(Audience::Manager),
            "teammate" => Ok(Audience::Teammate),
            "client" => Ok(Audience::Client),
            "public" => Ok(Audience::Public),
            other => Err(validation(format!(
                "Invalid audience '{other}'. Must be one of: manager, teammate, client, public"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    Llm,
    TemplateFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftedMessage {
    pub subject: Option<String>,
    pub message: String,
    pub tone: Tone,
    pub estimated_tokens: usize,
    pub message_length: usize,
    pub generation_method: GenerationMethod,
}

#[derive(Deserialize)]
struct LlmDraft {
    subject: Option<String>,
    message: Option<String>,
    tone: Option<String>,
}

fn validation(message: String) -> TrellisError {
    TrellisError::AgentValidation { agent: "liaison".to_string(), message }
}

pub struct LiaisonAgent {
    provider: Arc<ProviderRouter>,
    preferences: Arc<dyn PreferencesStore>,
    memory: Arc<dyn MemorySink>,
    retry: RetryPolicy,
    timeout: Duration,
    user_id: String,
}

impl LiaisonAgent {
    pub fn new(
        provider: Arc<ProviderRouter>,
        preferences: Arc<dyn PreferencesStore>,
        memory: Arc<dyn MemorySink>,
    ) -> Self {
        Self {
            provider,
            preferences,
            memory,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
            user_id: "default".to_string(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drafts a message about `goal` for the given audience.
    ///
    /// `tone: None` resolves to the user's preferred tone. Each generation
    /// attempt runs under its own deadline; once retries are exhausted the
    /// draft falls back to templates.
    pub async fn draft_message(
        &self,
        goal: &str,
        message_type: MessageType,
        audience: Audience,
        tone: Option<Tone>,
        context: &Map<String, Value>,
    ) -> Result<DraftedMessage> {
        self.validate_goal(goal)?;

        let prefs = match self.preferences.get_preferences(&self.user_id).await {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(error = %err, "preference read failed, using defaults");
                UserPreferences::for_user(&self.user_id)
            }
        };
        let tone = tone
            .or_else(|| Tone::from_str(&prefs.tone).ok())
            .unwrap_or(Tone::Professional);

        // Retry outside, per-attempt deadline inside: a hung call costs one
        // attempt, not the whole budget.
        let generation = with_retry(&self.retry, || {
            with_timeout(
                "liaison_generate",
                self.timeout,
                self.generate_with_llm(goal, message_type, audience, tone, context, &prefs),
            )
        })
        .await;

        let draft = match generation {
            Ok(draft) => draft,
            Err(err) => {
                warn!(error = %err, "LLM generation failed, using template fallback");
                self.generate_with_template(goal, message_type, tone, context)
            }
        };

        if let Err(err) = self
            .memory
            .record(MemoryEntry::new("liaison", draft.message.clone()))
            .await
        {
            warn!(error = %err, "drafted message was not persisted");
        }

        Ok(draft)
    }

    fn validate_goal(&self, goal: &str) -> Result<()> {
        if goal.trim().is_empty() {
            return Err(validation(
                "Goal cannot be empty. Provide a brief description of what you're \
                 communicating about."
                    .to_string(),
            ));
        }
        let chars = goal.chars().count();
        if chars > MAX_GOAL_CHARS {
            return Err(validation(format!(
                "Goal is too long ({chars} chars). Keep it under {MAX_GOAL_CHARS} characters."
            )));
        }
        Ok(())
    }

    async fn generate_with_llm(
        &self,
        goal: &str,
        message_type: MessageType,
        audience: Audience,
        tone: Tone,
        context: &Map<String, Value>,
        prefs: &UserPreferences,
    ) -> Result<DraftedMessage> {
        let system = system_prompt(message_type, audience, tone);
        let user = user_prompt(goal, message_type, audience, tone, context, prefs);

        let response = self
            .provider
            .chat(
                &[ChatMessage::system(system), ChatMessage::user(user)],
                None,
            )
            .await?;

        parse_llm_draft(&response, tone)
    }

    fn generate_with_template(
        &self,
        goal: &str,
        message_type: MessageType,
        tone: Tone,
        context: &Map<String, Value>,
    ) -> DraftedMessage {
        let status = context_str(context, "status", "in progress");
        let next_steps = context_list(context, "next_steps", "continue development");

        let full = template_for(message_type, tone)
            .replace("{goal}", goal)
            .replace("{status}", &status)
            .replace("{next_steps}", &next_steps);

        let (subject, message) = match full.strip_prefix("Subject:") {
            Some(rest) => {
                let mut lines = rest.splitn(2, '\n');
                let subject = lines.next().unwrap_or_default().trim().to_string();
                let message = lines.next().unwrap_or(&full).trim().to_string();
                (Some(subject), message)
            }
            None => {
                let truncated: String = goal.chars().take(50).collect();
                (Some(format!("Update: {truncated}")), full)
            }
        };

        DraftedMessage {
            estimated_tokens: estimate_tokens(&message),
            message_length: message.chars().count(),
            subject,
            message,
            tone,
            generation_method: GenerationMethod::TemplateFallback,
        }
    }
}

#[async_trait]
impl AuxiliaryAgent for LiaisonAgent {
    fn name(&self) -> &str {
        "liaison"
    }

    async fn run(&self, input: &AgentInput) -> Result<Value> {
        let draft = self
            .draft_message(
                &input.goal,
                MessageType::StatusUpdate,
                Audience::Teammate,
                None,
                &Map::new(),
            )
            .await?;
        Ok(serde_json::to_value(draft)?)
    }
}

fn parse_llm_draft(response: &str, expected_tone: Tone) -> Result<DraftedMessage> {
    let start = response.find('{');
    let end = response.rfind('}');
    let slice = match (start, end) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => {
            return Err(TrellisError::EmptyResponse(
                "liaison response contained no JSON object".into(),
            ));
        }
    };

    let draft: LlmDraft = serde_json::from_str(slice).map_err(|err| {
        TrellisError::InvalidResponse(format!("could not parse drafted message: {err}"))
    })?;

    let message = draft.message.unwrap_or_default().trim().to_string();
    if message.is_empty() {
        return Err(TrellisError::EmptyResponse("liaison returned an empty message".into()));
    }
    if message.chars().count() < MIN_MESSAGE_CHARS {
        return Err(TrellisError::EmptyResponse(format!(
            "generated message too short ({} chars)",
            message.chars().count()
        )));
    }

    let tone = draft
        .tone
        .as_deref()
        .and_then(|t| Tone::from_str(t).ok())
        .unwrap_or(expected_tone);

    Ok(DraftedMessage {
        estimated_tokens: estimate_tokens(response),
        message_length: message.chars().count(),
        subject: draft.subject,
        message,
        tone,
        generation_method: GenerationMethod::Llm,
    })
}

/// ~4 characters per token, never zero.
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(1)
}

fn context_str(context: &Map<String, Value>, key: &str, default: &str) -> String {
    match context.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}

fn context_list(context: &Map<String, Value>, key: &str, default: &str) -> String {
    match context.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

fn system_prompt(message_type: MessageType, audience: Audience, tone: Tone) -> String {
    let tone_guidance = match tone {
        Tone::Professional => "Polished and precise; complete sentences, no slang.",
        Tone::Casual => "Friendly and relaxed; contractions are fine.",
        Tone::Direct => "Brief and to the point; lead with the ask.",
    };
    format!(
        "You are Trellis-Liaison, a communication assistant.\n\
         Draft a {} message for a {}.\n\
         Tone: {} — {}\n\
         Reply with a JSON object containing subject, message, and tone fields.",
        message_type.as_str(),
        audience.as_str(),
        tone.as_str(),
        tone_guidance
    )
}

fn user_prompt(
    goal: &str,
    message_type: MessageType,
    audience: Audience,
    tone: Tone,
    context: &Map<String, Value>,
    prefs: &UserPreferences,
) -> String {
    let mut prompt = String::new();

    if let Some(example) = few_shot_example(message_type) {
        prompt.push_str(&format!(
            "Here's an example of a great {} message:\n\n{example}\n\n---\n\n",
            message_type.as_str()
        ));
    }

    prompt.push_str(&format!(
        "Now draft a {} message with these parameters:\n\n\
         GOAL/TOPIC: {goal}\nAUDIENCE: {}\nTONE: {}\n\n",
        message_type.as_str(),
        audience.as_str(),
        tone.as_str()
    ));

    if context.is_empty() {
        prompt.push_str("No additional context provided\n");
    } else {
        prompt.push_str("Additional context:\n");
        for (key, value) in context {
            match value {
                Value::Array(items) => {
                    let joined = items
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    prompt.push_str(&format!("  - {key}: {joined}\n"));
                }
                Value::String(s) => prompt.push_str(&format!("  - {key}: {s}\n")),
                other => prompt.push_str(&format!("  - {key}: {other}\n")),
            }
        }
    }

    prompt.push_str(&format!(
        "\nUSER PREFERENCES: {}\n\n\
         Return valid JSON with subject, message, and tone fields exactly as specified.",
        prefs.to_prompt_context()
    ));
    prompt
}

fn few_shot_example(message_type: MessageType) -> Option<&'static str> {
    match message_type {
        MessageType::StatusUpdate => Some(
            r#"INPUT: Weekly update on the payments migration
OUTPUT: {"subject": "Payments migration: on track for Friday", "message": "Quick status on the payments migration: ledger export and dual-write are done, reconciliation checks are running in staging. Remaining work is the cutover runbook, which I expect to finish by Thursday. No blockers.", "tone": "professional"}"#,
        ),
        MessageType::HelpRequest => Some(
            r#"INPUT: Need a review on the auth changes before release
OUTPUT: {"subject": "Review needed: auth changes", "message": "Could you review the auth changes today? The release train leaves tomorrow morning and this is the last item on the checklist. The diff is small and focused on session renewal.", "tone": "direct"}"#,
        ),
        _ => None,
    }
}

fn template_for(message_type: MessageType, tone: Tone) -> &'static str {
    match (message_type, tone) {
        (MessageType::StatusUpdate, Tone::Casual) => {
            "Subject: Quick update on {goal}\n\nHey! Quick note on {goal} — currently {status}. \
             Next up: {next_steps}. Shout if you have questions!"
        }
        (MessageType::StatusUpdate, Tone::Direct) => {
            "Subject: {goal}: status\n\nStatus: {status}.\nNext steps: {next_steps}."
        }
        (MessageType::HelpRequest, _) => {
            "Subject: Help needed with {goal}\n\nI could use help with {goal}. \
             Current status: {status}. Planned next steps: {next_steps}."
        }
        _ => {
            "Subject: Update on {goal}\n\nStatus update regarding {goal}.\n\n\
             Current status: {status}\nNext steps: {next_steps}"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use trellis_core::ChatProvider;
    use trellis_model::MockChat;
    use trellis_session::InMemoryPreferencesStore;
    use trellis_memory::InMemorySink;

    fn agent_with(chat: MockChat) -> (LiaisonAgent, Arc<InMemorySink>) {
        let router = Arc::new(
            ProviderRouter::new("mock").register_instance("mock", Arc::new(chat)),
        );
        let memory = Arc::new(InMemorySink::new());
        let agent = LiaisonAgent::new(
            router,
            Arc::new(InMemoryPreferencesStore::new()),
            memory.clone(),
        )
        .with_retry_policy(
            RetryPolicy::default()
                .with_base_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        );
        (agent, memory)
    }

    const GOOD_REPLY: &str = r#"{"subject": "Weekly update", "message": "The todo app MVP is coming along nicely; core flows are done.", "tone": "professional"}"#;

    /// Hangs on the first call, answers promptly afterwards.
    struct SlowFirstCall {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChatProvider for SlowFirstCall {
        fn name(&self) -> &str {
            "slow-first"
        }

        async fn chat_complete(
            &self,
            _messages: &[ChatMessage],
            _tools: Option<&Value>,
        ) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(GOOD_REPLY.to_string())
        }
    }

    #[tokio::test]
    async fn hung_attempt_is_timed_out_and_retried() {
        let provider = Arc::new(SlowFirstCall { calls: AtomicU32::new(0) });
        let router = Arc::new(
            ProviderRouter::new("slow-first").register_instance("slow-first", provider.clone()),
        );
        let agent = LiaisonAgent::new(
            router,
            Arc::new(InMemoryPreferencesStore::new()),
            Arc::new(InMemorySink::new()),
        )
        .with_retry_policy(
            RetryPolicy::default()
                .with_base_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        )
        .with_timeout(Duration::from_millis(20));

        let draft = agent
            .draft_message(
                "ship the beta",
                MessageType::StatusUpdate,
                Audience::Manager,
                Some(Tone::Professional),
                &Map::new(),
            )
            .await
            .unwrap();

        // The deadline costs one attempt, not the run: the second, prompt
        // attempt still produces an LLM draft.
        assert_eq!(draft.generation_method, GenerationMethod::Llm);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_goal_is_rejected() {
        let (agent, _) = agent_with(MockChat::new("mock"));
        let err = agent
            .draft_message("  ", MessageType::StatusUpdate, Audience::Teammate, None, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrellisError::AgentValidation { .. }));
    }

    #[tokio::test]
    async fn overlong_goal_is_rejected() {
        let (agent, _) = agent_with(MockChat::new("mock"));
        let goal = "x".repeat(MAX_GOAL_CHARS + 1);
        let err = agent
            .draft_message(&goal, MessageType::StatusUpdate, Audience::Teammate, None, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrellisError::AgentValidation { .. }));
    }

    #[tokio::test]
    async fn llm_draft_is_parsed_and_persisted() {
        let (agent, memory) = agent_with(MockChat::new("mock").with_response(GOOD_REPLY));
        let draft = agent
            .draft_message(
                "todo app progress",
                MessageType::StatusUpdate,
                Audience::Manager,
                Some(Tone::Professional),
                &Map::new(),
            )
            .await
            .unwrap();

        assert_eq!(draft.generation_method, GenerationMethod::Llm);
        assert_eq!(draft.subject.as_deref(), Some("Weekly update"));
        assert_eq!(draft.tone, Tone::Professional);
        assert!(draft.estimated_tokens >= 1);

        let notes = memory.recent(5).await.unwrap();
        assert_eq!(notes[0].source, "liaison");
    }

    #[tokio::test]
    async fn provider_outage_falls_back_to_template() {
        // Empty script: every attempt yields a retriable empty-response error.
        let (agent, _) = agent_with(MockChat::new("mock"));
        let draft = agent
            .draft_message(
                "ship the blog",
                MessageType::StatusUpdate,
                Audience::Teammate,
                Some(Tone::Direct),
                &Map::new(),
            )
            .await
            .unwrap();

        assert_eq!(draft.generation_method, GenerationMethod::TemplateFallback);
        assert!(draft.message.contains("in progress"));
        assert_eq!(draft.subject.as_deref(), Some("ship the blog: status"));
    }

    #[tokio::test]
    async fn short_llm_message_triggers_fallback() {
        let short = r#"{"message": "too short", "tone": "casual"}"#;
        let (agent, _) = agent_with(
            MockChat::new("mock")
                .with_response(short)
                .with_response(short)
                .with_response(short),
        );
        let draft = agent
            .draft_message(
                "write docs",
                MessageType::StatusUpdate,
                Audience::Teammate,
                Some(Tone::Casual),
                &Map::new(),
            )
            .await
            .unwrap();
        assert_eq!(draft.generation_method, GenerationMethod::TemplateFallback);
    }

    #[tokio::test]
    async fn tone_defaults_to_user_preference() {
        let (agent, _) = agent_with(MockChat::new("mock"));
        // Preferences store is empty: the default profile is professional.
        let draft = agent
            .draft_message(
                "quarterly summary",
                MessageType::Progress,
                Audience::Manager,
                None,
                &Map::new(),
            )
            .await
            .unwrap();
        assert_eq!(draft.tone, Tone::Professional);
    }

    #[tokio::test]
    async fn template_uses_context_values() {
        let (agent, _) = agent_with(MockChat::new("mock"));
        let mut context = Map::new();
        context.insert("status".to_string(), Value::String("blocked on review".into()));
        context.insert(
            "next_steps".to_string(),
            Value::Array(vec![Value::String("ping reviewer".into())]),
        );

        let draft = agent
            .draft_message(
                "release v2",
                MessageType::StatusUpdate,
                Audience::Teammate,
                Some(Tone::Direct),
                &context,
            )
            .await
            .unwrap();
        assert!(draft.message.contains("blocked on review"));
        assert!(draft.message.contains("ping reviewer"));
    }

    #[test]
    fn enums_parse_their_wire_names() {
        assert_eq!("status_update".parse::<MessageType>().unwrap(), MessageType::StatusUpdate);
        assert_eq!("casual".parse::<Tone>().unwrap(), Tone::Casual);
        assert_eq!("client".parse::<Audience>().unwrap(), Audience::Client);
        assert!("shouty".parse::<Tone>().is_err());
    }
}
