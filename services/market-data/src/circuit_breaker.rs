//! Async circuit breaker keyed by provider, for the Market Data Coordinator.
//!
//! `flasharb_types::CircuitBreaker` is the sync, single-instance version the
//! Risk Supervisor uses per chain. The Coordinator instead holds one breaker
//! per registered provider behind an async lock, since breaker checks here
//! happen alongside `.await`ed provider calls rather than purely in-process
//! bookkeeping.

use flasharb_types::{CircuitBreakerConfig, CircuitState};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Thread-safe circuit breaker for a single provider.
pub struct CircuitBreaker {
    state: Arc<RwLock<CircuitState>>,
    failure_count: Arc<AtomicU32>,
    success_count: Arc<AtomicU32>,
    last_failure_at: Arc<RwLock<Option<Instant>>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(CircuitState::Closed)),
            failure_count: Arc::new(AtomicU32::new(0)),
            success_count: Arc::new(AtomicU32::new(0)),
            last_failure_at: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Whether a call addressed to this provider may proceed right now.
    /// Flips Open -> HalfOpen once the cooldown has elapsed (§5: "will not
    /// reach that subject until the breaker's next-retry time has elapsed").
    pub async fn allow_request(&self) -> bool {
        let mut state = self.state.write().await;
        match *state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_at
                    .read()
                    .await
                    .map(|t| t.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if elapsed {
                    *state = CircuitState::HalfOpen;
                    self.failure_count.store(0, Ordering::Relaxed);
                    self.success_count.store(0, Ordering::Relaxed);
                    tracing::info!("circuit breaker transitioning to half-open");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn on_success(&self) {
        let mut state = self.state.write().await;
        match *state {
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    *state = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::Relaxed);
                    tracing::info!("circuit breaker closed after {} successes", successes);
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    pub async fn on_failure(&self) {
        let mut state = self.state.write().await;
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure_at.write().await = Some(Instant::now());

        match *state {
            CircuitState::Closed => {
                if failures >= self.config.failure_threshold {
                    *state = CircuitState::Open;
                    tracing::warn!("circuit breaker opened after {} failures", failures);
                }
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                tracing::warn!("circuit breaker reopened from half-open state");
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
            success_threshold: 1,
        });
        assert!(breaker.allow_request().await);
        breaker.on_failure().await;
        assert!(breaker.allow_request().await);
        breaker.on_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(!breaker.allow_request().await);
    }

    #[tokio::test]
    async fn half_open_recloses_on_success() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_millis(0),
            success_threshold: 1,
        });
        breaker.on_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(breaker.allow_request().await);
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);
        breaker.on_success().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
