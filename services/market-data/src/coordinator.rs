//! `route()` — the Coordinator's single request surface (§4.1).

use crate::error::CoordinatorError;
use crate::load_balancer::LoadBalancer;
use crate::rate_limit::RateLimiter;
use crate::registry::{ProviderRecord, ProviderRegistry};
use flasharb_types::Capability;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct CoordinatorConfig {
    pub retry_attempts: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub failover_enabled: bool,
}

impl From<&flasharb_config::CoordinatorConfig> for CoordinatorConfig {
    fn from(c: &flasharb_config::CoordinatorConfig) -> Self {
        Self {
            retry_attempts: c.retry_attempts,
            retry_backoff_base_ms: c.retry_backoff_base_ms,
            retry_backoff_cap_ms: c.retry_backoff_cap_ms,
            failover_enabled: true,
        }
    }
}

pub struct Coordinator {
    registry: ProviderRegistry,
    balancer: LoadBalancer,
    rate_limiter: RateLimiter,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(registry: ProviderRegistry, policy: flasharb_types::LoadBalancingPolicy, config: CoordinatorConfig) -> Self {
        Self {
            registry,
            balancer: LoadBalancer::new(policy),
            rate_limiter: RateLimiter::new(),
            config,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Route a call under `capability`, with retry-with-backoff against one
    /// provider followed by a single non-recursive failover attempt (§4.1
    /// points 3-4). `call` is invoked once per attempt with the selected
    /// provider's record; its own errors should be of the `ProviderError`/
    /// `Timeout` variety so `counts_as_breaker_failure()` classifies them.
    pub async fn route<F, Fut, T>(
        &self,
        capability: Capability,
        call: F,
    ) -> Result<T, CoordinatorError>
    where
        F: Fn(Arc<ProviderRecord>) -> Fut,
        Fut: Future<Output = Result<T, CoordinatorError>>,
    {
        let candidates = self.registry.eligible(capability);
        if candidates.is_empty() {
            return Err(CoordinatorError::NoEligibleProvider { capability });
        }

        let primary = self
            .balancer
            .select(&candidates)
            .ok_or(CoordinatorError::NoEligibleProvider { capability })?;

        match self.dispatch_with_retry(&primary, &call).await {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                if !self.config.failover_enabled {
                    return Err(primary_err);
                }
                let failover_candidates: Vec<_> = candidates
                    .into_iter()
                    .filter(|p| p.key() != primary.key())
                    .collect();
                let Some(failover) = self.balancer.select(&failover_candidates) else {
                    return Err(CoordinatorError::Exhausted { capability });
                };
                self.dispatch_once(&failover, &call)
                    .await
                    .map_err(|_| CoordinatorError::Exhausted { capability })
            }
        }
    }

    async fn dispatch_with_retry<F, Fut, T>(
        &self,
        provider: &Arc<ProviderRecord>,
        call: &F,
    ) -> Result<T, CoordinatorError>
    where
        F: Fn(Arc<ProviderRecord>) -> Fut,
        Fut: Future<Output = Result<T, CoordinatorError>>,
    {
        let mut last_err = None;
        for attempt in 0..=self.config.retry_attempts {
            if attempt > 0 {
                let backoff_ms = (self.config.retry_backoff_base_ms * 2u64.pow(attempt - 1))
                    .min(self.config.retry_backoff_cap_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            match self.dispatch_once(provider, call).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(CoordinatorError::Exhausted {
            capability: Capability::Pricing,
        }))
    }

    async fn dispatch_once<F, Fut, T>(
        &self,
        provider: &Arc<ProviderRecord>,
        call: &F,
    ) -> Result<T, CoordinatorError>
    where
        F: Fn(Arc<ProviderRecord>) -> Fut,
        Fut: Future<Output = Result<T, CoordinatorError>>,
    {
        if !provider.breaker.allow_request().await {
            return Err(CoordinatorError::BreakerOpen {
                provider: provider.key().to_string(),
            });
        }
        self.rate_limiter.wait(provider.key()).await;

        provider.in_flight.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let timeout = Duration::from_millis(provider.config.timeout_ms);
        let result = tokio::time::timeout(timeout, call(provider.clone())).await;
        provider.in_flight.fetch_sub(1, Ordering::Relaxed);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.rate_limiter.record_request(provider.key(), result.is_ok());

        match result {
            Ok(Ok(value)) => {
                provider.health.write().record_success(elapsed_ms);
                provider.breaker.on_success().await;
                Ok(value)
            }
            Ok(Err(err)) => {
                if err.counts_as_breaker_failure() {
                    provider.health.write().record_failure();
                    provider.breaker.on_failure().await;
                }
                Err(err)
            }
            Err(_) => {
                provider.health.write().record_failure();
                provider.breaker.on_failure().await;
                Err(CoordinatorError::Timeout {
                    provider: provider.key().to_string(),
                    timeout_ms: provider.config.timeout_ms,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_config::DataProviderConfig;
    use flasharb_types::{CircuitBreakerConfig, LoadBalancingPolicy, PriorityTier};
    use std::sync::atomic::AtomicU32;

    fn registry_with(key: &str) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry.register(
            DataProviderConfig {
                key: key.to_string(),
                capabilities: vec![Capability::Pricing],
                priority: PriorityTier::Medium,
                timeout_ms: 1000,
                max_concurrency: 8,
                enabled: true,
                base_url: String::new(),
            },
            CircuitBreakerConfig::default(),
        );
        registry
    }

    #[tokio::test]
    async fn successful_call_returns_value() {
        let coordinator = Coordinator::new(
            registry_with("only"),
            LoadBalancingPolicy::RoundRobin,
            CoordinatorConfig {
                retry_attempts: 0,
                retry_backoff_base_ms: 1,
                retry_backoff_cap_ms: 10,
                failover_enabled: true,
            },
        );
        let result = coordinator
            .route(Capability::Pricing, |_p| async { Ok::<_, CoordinatorError>(42) })
            .await
            .unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn no_eligible_provider_errors_immediately() {
        let coordinator = Coordinator::new(
            ProviderRegistry::new(),
            LoadBalancingPolicy::RoundRobin,
            CoordinatorConfig {
                retry_attempts: 0,
                retry_backoff_base_ms: 1,
                retry_backoff_cap_ms: 10,
                failover_enabled: true,
            },
        );
        let err = coordinator
            .route(Capability::Pricing, |_p| async { Ok::<_, CoordinatorError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NoEligibleProvider { .. }));
    }

    #[tokio::test]
    async fn retries_before_failing() {
        let attempts = Arc::new(AtomicU32::new(0));
        let coordinator = Coordinator::new(
            registry_with("only"),
            LoadBalancingPolicy::RoundRobin,
            CoordinatorConfig {
                retry_attempts: 2,
                retry_backoff_base_ms: 1,
                retry_backoff_cap_ms: 2,
                failover_enabled: false,
            },
        );
        let attempts_clone = attempts.clone();
        let result = coordinator
            .route(Capability::Pricing, move |p| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    Err(CoordinatorError::ProviderError {
                        provider: p.key().to_string(),
                        message: "boom".into(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }
}
