use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    #[error("Provider returned no usable content: {0}")]
    EmptyResponse(String),

    #[error("Provider response did not match the expected structure: {0}")]
    InvalidResponse(String),

    #[error("Provider request timed out: {0}")]
    ProviderTimeout(String),

    #[error("Provider rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider rejected credentials: {0}")]
    Authentication(String),

    #[error("Provider service error: {0}")]
    Service(String),

    #[error("Operation '{operation}' timed out after {timeout:?}")]
    AgentTimeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Agent '{agent}' validation failed: {message}")]
    AgentValidation { agent: String, message: String },

    #[error("Circuit breaker '{0}' is open; call rejected")]
    CircuitOpen(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrellisError>;

impl TrellisError {
    /// Whether a retry of the failed provider call could plausibly succeed.
    ///
    /// Empty output, timeouts (provider-side or a blown per-attempt
    /// deadline), rate limits and upstream service failures are transient;
    /// authentication and structural errors are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse(_)
                | Self::ProviderTimeout(_)
                | Self::RateLimit { .. }
                | Self::Service(_)
                | Self::AgentTimeout { .. }
        )
    }

    /// Server-suggested wait before the next attempt, when the provider gave one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrellisError::EmptyResponse("blank completion".to_string());
        assert_eq!(
            err.to_string(),
            "Provider returned no usable content: blank completion"
        );
    }

    #[test]
    fn test_transient_errors_are_retriable() {
        assert!(TrellisError::EmptyResponse("".into()).is_retriable());
        assert!(TrellisError::ProviderTimeout("slow".into()).is_retriable());
        assert!(TrellisError::Service("500".into()).is_retriable());
        assert!(
            TrellisError::RateLimit { message: "429".into(), retry_after: None }.is_retriable()
        );
        let timeout = TrellisError::AgentTimeout {
            operation: "liaison_generate".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(timeout.is_retriable());
    }

    #[test]
    fn test_permanent_errors_are_not_retriable() {
        assert!(!TrellisError::Authentication("bad key".into()).is_retriable());
        assert!(!TrellisError::InvalidResponse("not JSON".into()).is_retriable());
        assert!(!TrellisError::CircuitOpen("openai".into()).is_retriable());
        assert!(!TrellisError::Validation("empty goal".into()).is_retriable());
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let err = TrellisError::RateLimit {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(TrellisError::Service("503".into()).retry_after(), None);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrellisError = io_err.into();
        assert!(matches!(err, TrellisError::Io(_)));
    }
}
