//! Per-provider request rate limiting.
//!
//! Data providers advertise their own limits via `DataProviderConfig`; the
//! Coordinator keys its limiters by the provider's registry key rather than
//! a closed enum, since the provider roster is config-driven.

use governor::{DefaultDirectRateLimiter, Quota};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RateLimiter {
    limiters: HashMap<String, Arc<DefaultDirectRateLimiter>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            limiters: HashMap::new(),
        }
    }

    pub fn configure_provider(&mut self, provider: &str, requests_per_minute: u32) {
        match NonZeroU32::try_from(requests_per_minute) {
            Ok(rate) => {
                let limiter = Arc::new(DefaultDirectRateLimiter::direct(Quota::per_minute(rate)));
                self.limiters.insert(provider.to_string(), limiter);
            }
            Err(_) => {
                tracing::warn!(provider, requests_per_minute, "invalid rate limit, ignoring");
            }
        }
    }

    /// Non-blocking check; `true` if no limiter is configured for this provider.
    pub fn check(&self, provider: &str) -> bool {
        self.limiters
            .get(provider)
            .map(|limiter| limiter.check().is_ok())
            .unwrap_or(true)
    }

    pub async fn wait(&self, provider: &str) {
        if let Some(limiter) = self.limiters.get(provider) {
            limiter.until_ready().await;
        }
    }

    pub fn check_n(&self, provider: &str, n: u32) -> bool {
        match NonZeroU32::try_from(n) {
            Ok(nonzero_n) => self
                .limiters
                .get(provider)
                .map(|limiter| limiter.check_n(nonzero_n).is_ok())
                .unwrap_or(true),
            Err(_) => false,
        }
    }
}

/// Rolling request/outcome counters per provider, used by the load balancer's
/// "fastest"/"least-loaded" policies and surfaced through status reporting.
pub struct RateLimitTracker {
    requests: Arc<dashmap::DashMap<String, RequestStats>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(dashmap::DashMap::new()),
        }
    }

    pub fn record_request(&self, provider: &str, success: bool) {
        self.requests
            .entry(provider.to_string())
            .and_modify(|stats| {
                stats.total += 1;
                if success {
                    stats.successful += 1;
                } else {
                    stats.rate_limited += 1;
                }
                stats.last_request = std::time::Instant::now();
            })
            .or_insert(RequestStats {
                total: 1,
                successful: if success { 1 } else { 0 },
                rate_limited: if success { 0 } else { 1 },
                last_request: std::time::Instant::now(),
            });
    }

    pub fn get_stats(&self) -> HashMap<String, RequestStats> {
        self.requests
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn reset(&self) {
        self.requests.clear();
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct RequestStats {
    pub total: u64,
    pub successful: u64,
    pub rate_limited: u64,
    pub last_request: std::time::Instant,
}

impl RequestStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    pub fn is_heavily_limited(&self) -> bool {
        self.rate_limited > self.successful
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_provider_always_allowed() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("unknown"));
    }

    #[test]
    fn configured_provider_enforces_quota() {
        let mut limiter = RateLimiter::new();
        limiter.configure_provider("dexscreener", 1);
        assert!(limiter.check("dexscreener"));
        assert!(!limiter.check("dexscreener"));
    }

    #[test]
    fn tracker_records_success_and_failure() {
        let tracker = RateLimitTracker::new();
        tracker.record_request("dexscreener", true);
        tracker.record_request("dexscreener", false);
        let stats = tracker.get_stats();
        let s = &stats["dexscreener"];
        assert_eq!(s.total, 2);
        assert_eq!(s.successful, 1);
        assert_eq!(s.rate_limited, 1);
    }
}
