//! Background health probing (§4.1 "Health monitoring").

use crate::registry::ProviderRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Spawns a task that polls every registered provider on `interval`,
/// invoking `probe` once per provider per tick. A failed probe increments
/// the provider's consecutive-error counter (three consecutive failures
/// mark it unhealthy); a successful probe resets health and restores weight
/// to 1.0 on recovery.
pub fn spawn<P, Fut>(
    registry: ProviderRegistry,
    interval: Duration,
    probe: P,
) -> tokio::task::JoinHandle<()>
where
    P: Fn(Arc<crate::registry::ProviderRecord>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for provider in registry.all() {
                let now_ms = chrono::Utc::now().timestamp_millis();
                if probe(provider.clone()).await {
                    provider.health.write().record_probe_success(now_ms);
                    tracing::debug!(provider = provider.key(), "health probe succeeded");
                } else {
                    provider.health.write().record_probe_failure(now_ms);
                    tracing::warn!(provider = provider.key(), "health probe failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_config::DataProviderConfig;
    use flasharb_types::{Capability, CircuitBreakerConfig, PriorityTier};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn probe_marks_unhealthy_after_three_failures() {
        let registry = ProviderRegistry::new();
        registry.register(
            DataProviderConfig {
                key: "flaky".to_string(),
                capabilities: vec![Capability::Pricing],
                priority: PriorityTier::Medium,
                timeout_ms: 1000,
                max_concurrency: 8,
                enabled: true,
                base_url: String::new(),
            },
            CircuitBreakerConfig::default(),
        );

        let handle = spawn(registry.clone(), Duration::from_millis(5), |_p| async { false });
        tokio::time::sleep(Duration::from_millis(25)).await;
        handle.abort();

        assert!(!registry.get("flaky").unwrap().health.read().healthy);
    }

    #[tokio::test]
    async fn probe_success_keeps_healthy() {
        let registry = ProviderRegistry::new();
        registry.register(
            DataProviderConfig {
                key: "steady".to_string(),
                capabilities: vec![Capability::Pricing],
                priority: PriorityTier::Medium,
                timeout_ms: 1000,
                max_concurrency: 8,
                enabled: true,
                base_url: String::new(),
            },
            CircuitBreakerConfig::default(),
        );

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let handle = spawn(registry.clone(), Duration::from_millis(5), move |_p| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::Relaxed);
                true
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();

        assert!(registry.get("steady").unwrap().health.read().healthy);
        assert!(calls.load(Ordering::Relaxed) > 0);
    }
}
