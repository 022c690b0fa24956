use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Capability tags a registered information provider can advertise. C1
/// filters its provider set by these before applying a load-balancing
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Pricing,
    MarketData,
    Trending,
    BlockchainRead,
    Bridges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancingPolicy {
    RoundRobin,
    LeastLoaded,
    Fastest,
    Priority,
    Weighted,
}

/// Live health record for a single registered information provider (C1).
/// Weight is bounded to [0.1, 2.0] and adjusted multiplicatively on every
/// call outcome (§3 invariant).
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub consecutive_errors: u32,
    /// Exponential moving average of response time, in milliseconds.
    pub avg_response_ms: f64,
    pub last_health_check_ms: i64,
    pub weight: Decimal,
}

const WEIGHT_FLOOR: Decimal = dec!(0.1);
const WEIGHT_CEIL: Decimal = dec!(2.0);
const EMA_ALPHA: f64 = 0.2;

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            healthy: true,
            consecutive_errors: 0,
            avg_response_ms: 0.0,
            last_health_check_ms: 0,
            weight: dec!(1.0),
        }
    }
}

impl ProviderHealth {
    pub fn record_success(&mut self, response_ms: f64) {
        self.consecutive_errors = 0;
        self.avg_response_ms = EMA_ALPHA * response_ms + (1.0 - EMA_ALPHA) * self.avg_response_ms;
        self.weight = (self.weight * dec!(1.1)).min(WEIGHT_CEIL);
    }

    pub fn record_failure(&mut self) {
        self.consecutive_errors += 1;
        self.weight = (self.weight * dec!(0.8)).max(WEIGHT_FLOOR);
        if self.consecutive_errors >= 3 {
            self.healthy = false;
        }
    }

    /// A provider recovers by passing one health probe; weight resets to
    /// 1.0 rather than ramping back up (§4.1 Health monitoring).
    pub fn record_probe_success(&mut self, now_ms: i64) {
        self.last_health_check_ms = now_ms;
        if !self.healthy {
            self.healthy = true;
            self.weight = dec!(1.0);
        }
        self.consecutive_errors = 0;
    }

    pub fn record_probe_failure(&mut self, now_ms: i64) {
        self.last_health_check_ms = now_ms;
        self.consecutive_errors += 1;
        if self.consecutive_errors >= 3 {
            self.healthy = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_consecutive_probe_failures_mark_unhealthy() {
        let mut health = ProviderHealth::default();
        health.record_probe_failure(1);
        health.record_probe_failure(2);
        assert!(health.healthy);
        health.record_probe_failure(3);
        assert!(!health.healthy);
    }

    #[test]
    fn recovery_resets_weight_to_one() {
        let mut health = ProviderHealth::default();
        health.weight = dec!(0.3);
        health.healthy = false;
        health.record_probe_success(10);
        assert!(health.healthy);
        assert_eq!(health.weight, dec!(1.0));
    }

    #[test]
    fn weight_floors_and_ceils() {
        let mut health = ProviderHealth::default();
        for _ in 0..50 {
            health.record_failure();
        }
        assert_eq!(health.weight, WEIGHT_FLOOR);
        health.weight = dec!(1.9);
        for _ in 0..10 {
            health.record_success(1.0);
        }
        assert_eq!(health.weight, WEIGHT_CEIL);
    }
}
