//! # Market Data Coordinator (C1)
//!
//! Single request surface over N registered off-chain information
//! providers (price/volume/trending feeds). Applies capability filtering,
//! a configurable load-balancing policy, retry-with-backoff, one
//! non-recursive failover attempt, and per-provider circuit breaking.
//! Runs a background health prober that can mark a provider unhealthy
//! and later recover it.
//!
//! ## Integration Points
//!
//! - **Input Sources**: `flasharb_config::DataProviderConfig` entries loaded
//!   at startup; HTTP responses from whichever provider the policy selects.
//! - **Output Destinations**: the Price Oracle (C2) calls `route()` under
//!   capability `Pricing`/`MarketData`/`Trending`; the Risk Supervisor (C9)
//!   and status reporting read provider health via `ProviderRegistry`.

mod circuit_breaker;
mod coordinator;
mod error;
mod load_balancer;
mod prober;
mod registry;
mod rate_limit;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use error::{CoordinatorError, ErrorKind};
pub use load_balancer::LoadBalancer;
pub use prober::spawn as spawn_health_prober;
pub use rate_limit::{RateLimitTracker, RateLimiter, RequestStats};
pub use registry::{ProviderRecord, ProviderRegistry};
