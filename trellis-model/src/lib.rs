//! Provider routing and fault tolerance for Trellis.
//!
//! Every LLM call in the workspace flows through this crate: the
//! [`ProviderRouter`] picks the backend by name at call time, a per-provider
//! [`CircuitBreaker`] fails fast during outages, and [`with_retry`] /
//! [`with_timeout`] bound transient failures and runaway calls.

mod circuit_breaker;
mod mock;
mod retry;
mod router;
mod timeout;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use mock::MockChat;
pub use retry::{RetryPolicy, with_retry};
pub use router::{ProviderFactory, ProviderRouter};
pub use timeout::with_timeout;
