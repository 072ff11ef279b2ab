use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the cool-down elapses
    Open,
    /// A trial request is let through to probe the node
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Number of successes in half-open state before closing
    pub success_threshold: u32,
    /// Time to wait before transitioning from open to half-open
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

/// Per-endpoint circuit breaker guarding a node URL.
///
/// All counters live behind one lock so a state transition and the counter
/// reset it implies are observed together.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: RwLock<Inner>,
    config: CircuitBreakerConfig,
    name: String,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        debug!(
            "Initializing circuit breaker '{}' with failure_threshold={}, success_threshold={}, timeout={:?}",
            name, config.failure_threshold, config.success_threshold, config.timeout
        );

        Self {
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
            config,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the circuit breaker allows the request, moving an expired
    /// open circuit to half-open
    pub async fn is_request_allowed(&self) -> bool {
        {
            let inner = self.inner.read().await;
            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => return true,
                CircuitState::Open => {
                    let expired = inner
                        .opened_at
                        .map(|at| at.elapsed() >= self.config.timeout)
                        .unwrap_or(true);
                    if !expired {
                        return false;
                    }
                }
            }
        }

        let mut inner = self.inner.write().await;
        if inner.state == CircuitState::Open {
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            info!("Circuit breaker '{}': Transitioned to HALF_OPEN state", self.name);
        }
        true
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                debug!(
                    "Circuit breaker '{}': Success in half-open state ({}/{})",
                    self.name, inner.success_count, self.config.success_threshold
                );

                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                    info!("Circuit breaker '{}': Transitioned to CLOSED state", self.name);
                }
            }
            CircuitState::Open => {
                warn!("Circuit breaker '{}': Success recorded in open state", self.name);
            }
        }
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                debug!(
                    "Circuit breaker '{}': Failure recorded ({}/{})",
                    self.name, inner.failure_count, self.config.failure_threshold
                );

                if inner.failure_count >= self.config.failure_threshold {
                    Self::open(&mut inner, &self.name);
                }
            }
            // Any failure while probing reopens the circuit
            CircuitState::HalfOpen => Self::open(&mut inner, &self.name),
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    fn open(inner: &mut Inner, name: &str) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.success_count = 0;
        warn!("Circuit breaker '{}': Transitioned to OPEN state", name);
    }
}
