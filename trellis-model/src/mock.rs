use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
};
use trellis_core::{ChatMessage, ChatProvider, Result, TrellisError};

/// Scripted in-memory provider for tests.
///
/// Replies (or errors) are consumed in order, one per call. An exhausted
/// script produces an empty-response error, which is retriable and therefore
/// also useful for driving retry and breaker paths.
pub struct MockChat {
    name: String,
    script: Mutex<VecDeque<Result<String>>>,
    calls: AtomicU32,
}

impl MockChat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(text.into()));
        self
    }

    #[must_use]
    pub fn with_error(self, error: TrellisError) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
        self
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_complete(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&Value>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(TrellisError::EmptyResponse(format!(
                    "mock provider '{}' script exhausted",
                    self.name
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_script_order() {
        let mock = MockChat::new("m").with_response("first").with_response("second");
        assert_eq!(
            mock.chat_complete(&[ChatMessage::user("a")], None).await.unwrap(),
            "first"
        );
        assert_eq!(
            mock.chat_complete(&[ChatMessage::user("b")], None).await.unwrap(),
            "second"
        );
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_error_then_exhaustion() {
        let mock = MockChat::new("m").with_error(TrellisError::Service("500".into()));
        assert!(matches!(
            mock.chat_complete(&[], None).await.unwrap_err(),
            TrellisError::Service(_)
        ));
        assert!(matches!(
            mock.chat_complete(&[], None).await.unwrap_err(),
            TrellisError::EmptyResponse(_)
        ));
    }
}
