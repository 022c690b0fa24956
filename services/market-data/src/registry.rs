//! Provider registration and capability-based eligibility filtering.

use crate::circuit_breaker::CircuitBreaker;
use flasharb_config::DataProviderConfig;
use flasharb_types::{Capability, CircuitBreakerConfig, ProviderHealth};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Everything the Coordinator tracks about one registered data provider.
pub struct ProviderRecord {
    pub config: DataProviderConfig,
    pub health: RwLock<ProviderHealth>,
    pub breaker: CircuitBreaker,
    pub in_flight: AtomicU32,
}

impl ProviderRecord {
    fn new(config: DataProviderConfig, breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            health: RwLock::new(ProviderHealth::default()),
            breaker: CircuitBreaker::new(breaker_config),
            in_flight: AtomicU32::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn advertises(&self, capability: Capability) -> bool {
        self.config.capabilities.contains(&capability)
    }
}

/// Registered provider set, keyed by the config-declared provider key.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<dashmap::DashMap<String, Arc<ProviderRecord>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(dashmap::DashMap::new()),
        }
    }

    pub fn from_configs(
        configs: &[DataProviderConfig],
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let registry = Self::new();
        for config in configs {
            if config.enabled {
                registry.register(config.clone(), breaker_config);
            }
        }
        registry
    }

    pub fn register(&self, config: DataProviderConfig, breaker_config: CircuitBreakerConfig) {
        let key = config.key.clone();
        self.providers
            .insert(key, Arc::new(ProviderRecord::new(config, breaker_config)));
    }

    pub fn get(&self, key: &str) -> Option<Arc<ProviderRecord>> {
        self.providers.get(key).map(|r| r.value().clone())
    }

    /// Providers advertising `capability`, filtered to currently-healthy
    /// ones. Breaker state is checked separately at dispatch time since it
    /// requires an async read.
    pub fn eligible(&self, capability: Capability) -> Vec<Arc<ProviderRecord>> {
        self.providers
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| p.advertises(capability) && p.health.read().healthy)
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<ProviderRecord>> {
        self.providers.iter().map(|e| e.value().clone()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_types::PriorityTier;

    fn sample_config(key: &str) -> DataProviderConfig {
        DataProviderConfig {
            key: key.to_string(),
            capabilities: vec![Capability::Pricing],
            priority: PriorityTier::Medium,
            timeout_ms: 5000,
            max_concurrency: 8,
            enabled: true,
            base_url: "https://example.invalid".into(),
        }
    }

    #[test]
    fn eligible_filters_by_capability_and_health() {
        let registry = ProviderRegistry::new();
        registry.register(sample_config("a"), CircuitBreakerConfig::default());
        registry.register(sample_config("b"), CircuitBreakerConfig::default());

        let candidates = registry.eligible(Capability::Pricing);
        assert_eq!(candidates.len(), 2);

        registry.get("a").unwrap().health.write().healthy = false;
        let candidates = registry.eligible(Capability::Pricing);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].key(), "b");
    }

    #[test]
    fn eligible_excludes_unadvertised_capability() {
        let registry = ProviderRegistry::new();
        let mut config = sample_config("trend-only");
        config.capabilities = vec![Capability::Trending];
        registry.register(config, CircuitBreakerConfig::default());
        assert!(registry.eligible(Capability::Pricing).is_empty());
    }
}
