use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use trellis_core::{Result, TrellisError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Successes in half-open before the circuit closes.
    pub success_threshold: u32,
    /// How long the circuit stays open before allowing a trial call.
    pub timeout: Duration,
    /// Concurrent trial calls allowed while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
        }
    }
}

impl CircuitBreakerConfig {
    #[must_use]
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    #[must_use]
    pub fn with_success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_half_open_max_calls(mut self, half_open_max_calls: u32) -> Self {
        self.half_open_max_calls = half_open_max_calls;
        self
    }
}

/// Snapshot of a breaker's counters, taken under the lock.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
    pub total_calls: u64,
    pub total_failures: u64,
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_in_flight: u32,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
    total_calls: u64,
    total_failures: u64,
}

impl BreakerState {
    fn set_open(&mut self) {
        self.state = CircuitState::Open;
        self.last_state_change = Instant::now();
        self.success_count = 0;
        self.half_open_in_flight = 0;
    }

    fn set_half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.last_state_change = Instant::now();
        self.success_count = 0;
        self.failure_count = 0;
        self.half_open_in_flight = 0;
    }

    fn set_closed(&mut self) {
        self.state = CircuitState::Closed;
        self.last_state_change = Instant::now();
        self.success_count = 0;
        self.failure_count = 0;
        self.half_open_in_flight = 0;
    }
}

/// Per-provider circuit breaker.
///
/// Stops calls to a provider that keeps failing: after `failure_threshold`
/// consecutive failures the circuit opens and every call is rejected without
/// touching the provider. Once `timeout` has passed, a bounded number of
/// trial calls probe the provider; `success_threshold` successes close the
/// circuit, a single failure reopens it.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_in_flight: 0,
                last_failure_time: None,
                last_state_change: Instant::now(),
                total_calls: 0,
                total_failures: 0,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `operation` through the breaker.
    ///
    /// Rejected calls (open circuit, exhausted half-open quota) return
    /// [`TrellisError::CircuitOpen`] without invoking the operation.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let trial = {
            let mut state = self.state.lock().await;
            state.total_calls += 1;

            if state.state == CircuitState::Open {
                let elapsed_timeout = state
                    .last_failure_time
                    .is_some_and(|at| at.elapsed() >= self.config.timeout);
                if elapsed_timeout {
                    state.set_half_open();
                    info!(breaker = %self.name, "circuit half-open, allowing trial call");
                } else {
                    return Err(TrellisError::CircuitOpen(self.name.clone()));
                }
            }

            if state.state == CircuitState::HalfOpen {
                if state.half_open_in_flight >= self.config.half_open_max_calls {
                    return Err(TrellisError::CircuitOpen(self.name.clone()));
                }
                state.half_open_in_flight += 1;
                true
            } else {
                false
            }
        };

        match operation().await {
            Ok(value) => {
                self.record_success(trial).await;
                Ok(value)
            }
            Err(error) => {
                self.record_failure(trial, &error).await;
                Err(error)
            }
        }
    }

    async fn record_success(&self, trial: bool) {
        let mut state = self.state.lock().await;
        state.failure_count = 0;
        if trial {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }

        if state.state == CircuitState::HalfOpen {
            state.success_count += 1;
            if state.success_count >= self.config.success_threshold {
                state.set_closed();
                info!(breaker = %self.name, "circuit closed after recovery");
            }
        }
    }

    async fn record_failure(&self, trial: bool, error: &TrellisError) {
        let mut state = self.state.lock().await;
        state.failure_count += 1;
        state.total_failures += 1;
        state.last_failure_time = Some(Instant::now());
        if trial {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }

        if state.state == CircuitState::HalfOpen {
            state.set_open();
            warn!(breaker = %self.name, "circuit reopened after failed recovery attempt");
        } else if state.state == CircuitState::Closed
            && state.failure_count >= self.config.failure_threshold
        {
            state.set_open();
            error!(
                breaker = %self.name,
                failures = state.failure_count,
                error = %error,
                "circuit opened after repeated failures"
            );
        }
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.lock().await;
        CircuitBreakerStats {
            state: state.state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            last_failure_time: state.last_failure_time,
            last_state_change: state.last_state_change,
            total_calls: state.total_calls,
            total_failures: state.total_failures,
        }
    }
}
