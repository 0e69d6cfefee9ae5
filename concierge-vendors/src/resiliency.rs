use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use concierge_core::providers::{ProviderError, ProviderResult};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failing fast
    HalfOpen, // One probe allowed
}

/// Per-vendor circuit breaker. After `failure_threshold` consecutive
/// failures the vendor is skipped for `reset_timeout`, then probed once.
pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold,
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    /// Five failures, thirty seconds.
    pub fn for_vendor(name: &str) -> Self {
        Self::new(name, 5, Duration::from_secs(30))
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_fail = *self.last_failure.read().await;
                match last_fail {
                    Some(instant) if instant.elapsed() > self.reset_timeout => {
                        *self.state.write().await = CircuitState::HalfOpen;
                        tracing::info!(circuit = %self.name, "Circuit breaker moving to half-open");
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            tracing::info!(circuit = %self.name, "Circuit breaker recovered");
        }
        *state = CircuitState::Closed;
        self.failure_count.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            if *state != CircuitState::Open {
                tracing::error!(circuit = %self.name, failures = count, "Circuit breaker tripped open");
            }
            *state = CircuitState::Open;
            *self.last_failure.write().await = Some(Instant::now());
        }
    }

    /// Runs `op` unless the circuit is open. Transport errors and 5xx
    /// responses count as failures; client errors do not.
    pub async fn call<T, F, Fut>(&self, op: F) -> ProviderResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        if !self.check().await {
            return Err(ProviderError::CircuitOpen(self.name.clone()));
        }

        let result = op().await;
        match &result {
            Err(ProviderError::Transport { .. }) => self.record_failure().await,
            Err(ProviderError::Status { status, .. }) if *status >= 500 => self.record_failure().await,
            _ => self.record_success().await,
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_error() -> ProviderResult<()> {
        Err(ProviderError::Transport { provider: "test", message: "connection refused".to_string() })
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new("test", 2, Duration::from_secs(60));

        let _ = breaker.call(|| async { transport_error() }).await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
        let _ = breaker.call(|| async { transport_error() }).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        let result = breaker.call(|| async { Ok(1) }).await;
        assert!(matches!(result, Err(ProviderError::CircuitOpen(name)) if name == "test"));
    }

    #[tokio::test]
    async fn test_half_open_probe_recovers() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(10));
        let _ = breaker.call(|| async { transport_error() }).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = breaker.call(|| async { Ok("back") }).await;
        assert_eq!(result.unwrap(), "back");
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_client_errors_do_not_trip() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_secs(60));
        let _ = breaker
            .call(|| async {
                Err::<(), _>(ProviderError::Status { provider: "test", status: 422, body: String::new() })
            })
            .await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
