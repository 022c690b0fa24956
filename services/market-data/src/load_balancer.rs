//! Provider selection policies (§4.1, `CoordinatorConfig::load_balancing`).

use crate::registry::ProviderRecord;
use flasharb_types::{LoadBalancingPolicy, PriorityTier};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct LoadBalancer {
    policy: LoadBalancingPolicy,
    round_robin_cursor: AtomicUsize,
}

impl LoadBalancer {
    pub fn new(policy: LoadBalancingPolicy) -> Self {
        Self {
            policy,
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// Pick one provider from an already capability/health-filtered
    /// candidate set. `None` only if `candidates` is empty.
    pub fn select(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        if candidates.is_empty() {
            return None;
        }
        match self.policy {
            LoadBalancingPolicy::RoundRobin => self.select_round_robin(candidates),
            LoadBalancingPolicy::LeastLoaded => self.select_least_loaded(candidates),
            LoadBalancingPolicy::Fastest => self.select_fastest(candidates),
            LoadBalancingPolicy::Priority => self.select_priority(candidates),
            LoadBalancingPolicy::Weighted => self.select_weighted(candidates),
        }
    }

    fn select_round_robin(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        let idx = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[idx].clone())
    }

    fn select_least_loaded(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        candidates
            .iter()
            .min_by_key(|p| p.in_flight.load(Ordering::Relaxed))
            .cloned()
    }

    fn select_fastest(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        candidates
            .iter()
            .min_by(|a, b| {
                let ra = a.health.read().avg_response_ms;
                let rb = b.health.read().avg_response_ms;
                ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    /// Picks from the highest-priority tier present, round-robining within it.
    fn select_priority(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        let best_tier: PriorityTier = candidates.iter().map(|p| p.config.priority).min()?;
        let tier_candidates: Vec<_> = candidates
            .iter()
            .filter(|p| p.config.priority == best_tier)
            .cloned()
            .collect();
        self.select_round_robin(&tier_candidates)
    }

    /// Proportional sampling by current health weight (§3: weight in
    /// [0.1, 2.0], higher weight draws proportionally more traffic).
    fn select_weighted(&self, candidates: &[Arc<ProviderRecord>]) -> Option<Arc<ProviderRecord>> {
        let weights: Vec<f64> = candidates
            .iter()
            .map(|p| {
                p.health
                    .read()
                    .weight
                    .to_string()
                    .parse::<f64>()
                    .unwrap_or(1.0)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return self.select_round_robin(candidates);
        }
        let mut draw = rand::thread_rng().gen_range(0.0..total);
        for (candidate, weight) in candidates.iter().zip(weights.iter()) {
            if draw < *weight {
                return Some(candidate.clone());
            }
            draw -= weight;
        }
        candidates.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_config::DataProviderConfig;
    use flasharb_types::{Capability, CircuitBreakerConfig};

    fn provider(key: &str, priority: PriorityTier) -> Arc<ProviderRecord> {
        use crate::circuit_breaker::CircuitBreaker;
        use flasharb_types::ProviderHealth;
        use parking_lot::RwLock;
        use std::sync::atomic::AtomicU32;

        Arc::new(ProviderRecord {
            config: DataProviderConfig {
                key: key.to_string(),
                capabilities: vec![Capability::Pricing],
                priority,
                timeout_ms: 5000,
                max_concurrency: 8,
                enabled: true,
                base_url: String::new(),
            },
            health: RwLock::new(ProviderHealth::default()),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            in_flight: AtomicU32::new(0),
        })
    }

    #[test]
    fn round_robin_cycles_through_candidates() {
        let balancer = LoadBalancer::new(LoadBalancingPolicy::RoundRobin);
        let candidates = vec![
            provider("a", PriorityTier::Medium),
            provider("b", PriorityTier::Medium),
        ];
        let first = balancer.select(&candidates).unwrap();
        let second = balancer.select(&candidates).unwrap();
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn priority_prefers_higher_tier() {
        let balancer = LoadBalancer::new(LoadBalancingPolicy::Priority);
        let candidates = vec![
            provider("low", PriorityTier::Low),
            provider("critical", PriorityTier::Critical),
        ];
        let chosen = balancer.select(&candidates).unwrap();
        assert_eq!(chosen.key(), "critical");
    }
}
