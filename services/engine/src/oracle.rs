//! # Price Oracle (C2)
//!
//! Fuses a periodic off-chain price snapshot (via C1, capability `pricing`)
//! with on-demand on-chain venue quotes (via C3), per SPEC_FULL.md §4.2.
//! A `PricePoint` is never returned older than its configured TTL; a pair
//! whose on-chain quote disagrees with the fused price by more than the
//! sanity bound is reported unavailable rather than stale.

use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use flasharb_market_data::{Coordinator, ProviderRecord};
use flasharb_types::{Capability, ChainId, PricePoint, VenueQuote};
use flasharb_venues::VenueAdapter;
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// One off-chain snapshot for a token, as returned by a data provider
/// before it is wrapped into a `PricePoint` with a timestamp.
#[derive(Debug, Clone)]
pub struct RawPriceQuote {
    pub unit_price: Decimal,
    pub volume_24h: Decimal,
    pub change_24h_pct: Decimal,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The off-chain fetch a data provider performs for one token. Supplied at
/// construction so this crate does not hardcode any single provider's REST
/// shape; `main.rs` wires the concrete implementation.
pub type PriceFetcher = Arc<
    dyn Fn(Arc<ProviderRecord>, Address) -> BoxFuture<Result<RawPriceQuote, flasharb_market_data::CoordinatorError>>
        + Send
        + Sync,
>;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no fresh price available for token {0:?}")]
    Unavailable(Address),
    #[error("on-chain cross-check diverged from fused price beyond sanity bound for token {0:?}")]
    Stale(Address),
    #[error("data provider error: {0}")]
    Provider(#[from] flasharb_market_data::CoordinatorError),
    #[error("venue quote error: {0}")]
    Venue(#[from] flasharb_venues::VenueError),
}

pub struct PriceOracle {
    coordinator: Arc<Coordinator>,
    fetcher: PriceFetcher,
    prices: DashMap<(ChainId, Address), PricePoint>,
    venue_quotes: DashMap<(ChainId, String, Address, Address), VenueQuote>,
    ttl_ms: i64,
    sanity_bound_pct: Decimal,
}

impl PriceOracle {
    pub fn new(coordinator: Arc<Coordinator>, fetcher: PriceFetcher, ttl_ms: i64, sanity_bound_pct: Decimal) -> Self {
        Self {
            coordinator,
            fetcher,
            prices: DashMap::new(),
            venue_quotes: DashMap::new(),
            ttl_ms,
            sanity_bound_pct,
        }
    }

    /// One refresh pass for a single watched token (§4.2: "periodically
    /// request a batched price snapshot from C1"). The caller drives the
    /// period via `tokio::time::interval`; batching across tokens is the
    /// data provider's own concern behind `route()`.
    pub async fn refresh(&self, chain_id: ChainId, token: Address, now_ms: i64) {
        let fetcher = self.fetcher.clone();
        let result = self
            .coordinator
            .route(Capability::Pricing, move |provider| fetcher(provider, token))
            .await;

        match result {
            Ok(raw) => self.accept(chain_id, token, raw, now_ms),
            Err(err) => {
                tracing::warn!(?token, chain_id, error = %err, "price refresh failed");
            }
        }
    }

    /// Discards the snapshot if it is not strictly newer than the last
    /// accepted one for this token (§5 "PricePoint updates are observed
    /// monotonically per token per process").
    fn accept(&self, chain_id: ChainId, token: Address, raw: RawPriceQuote, now_ms: i64) {
        let key = (chain_id, token);
        if let Some(existing) = self.prices.get(&key) {
            if existing.observed_at_ms >= now_ms {
                return;
            }
        }
        self.prices.insert(
            key,
            PricePoint {
                unit_price: raw.unit_price,
                volume_24h: raw.volume_24h,
                change_24h_pct: raw.change_24h_pct,
                provider: "fused".to_string(),
                observed_at_ms: now_ms,
            },
        );
    }

    /// A fresh fused price, or `None` if absent or older than the TTL
    /// (§4.2: "a stale pair is reported as unavailable rather than
    /// returning a stale value").
    pub fn get_price(&self, chain_id: ChainId, token: Address, now_ms: i64) -> Option<PricePoint> {
        self.prices.get(&(chain_id, token)).and_then(|entry| {
            if entry.is_fresh(now_ms, self.ttl_ms) {
                Some(entry.clone())
            } else {
                None
            }
        })
    }

    /// Mandatory cross-check before an opportunity touching `(token_in,
    /// token_out)` is allowed into the execution queue (§4.2): requests an
    /// on-chain quote via the venue adapter and compares its implied price
    /// against the fused off-chain price for `token_in`.
    pub async fn cross_checked_quote(
        &self,
        chain_id: ChainId,
        venue_key: &str,
        venue: &VenueAdapter,
        token_in: Address,
        token_out: Address,
        amount_in: Decimal,
        amount_in_raw: U256,
        now_ms: i64,
    ) -> Result<VenueQuote, OracleError> {
        let amount_out_raw = venue.quote(token_in, token_out, amount_in_raw).await?;
        let amount_out = crate::units::u256_to_decimal(amount_out_raw, 18);

        let quote = VenueQuote {
            chain_id,
            venue_key: venue_key.to_string(),
            token_in,
            token_out,
            amount_in,
            amount_out,
            block_number: 0,
            observed_at_ms: now_ms,
        };

        if let Some(fused) = self.get_price(chain_id, token_in, now_ms) {
            if let Some(implied) = quote.implied_price() {
                let diff_pct = ((implied - fused.unit_price) / fused.unit_price).abs() * Decimal::ONE_HUNDRED;
                if diff_pct > self.sanity_bound_pct {
                    return Err(OracleError::Stale(token_in));
                }
            }
        }

        self.venue_quotes.insert(
            (chain_id, venue_key.to_string(), token_in, token_out),
            quote.clone(),
        );
        Ok(quote)
    }

    pub fn cached_quote(
        &self,
        chain_id: ChainId,
        venue_key: &str,
        token_in: Address,
        token_out: Address,
    ) -> Option<VenueQuote> {
        self.venue_quotes
            .get(&(chain_id, venue_key.to_string(), token_in, token_out))
            .map(|q| q.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_config::DataProviderConfig;
    use flasharb_market_data::CoordinatorConfig as MdCoordinatorConfig;
    use flasharb_types::{CircuitBreakerConfig, LoadBalancingPolicy, PriorityTier};
    use rust_decimal_macros::dec;

    fn coordinator() -> Arc<Coordinator> {
        let registry = flasharb_market_data::ProviderRegistry::new();
        registry.register(
            DataProviderConfig {
                key: "feed".into(),
                capabilities: vec![Capability::Pricing],
                priority: PriorityTier::Medium,
                timeout_ms: 1000,
                max_concurrency: 8,
                enabled: true,
                base_url: String::new(),
            },
            CircuitBreakerConfig::default(),
        );
        Arc::new(Coordinator::new(
            registry,
            LoadBalancingPolicy::RoundRobin,
            MdCoordinatorConfig {
                retry_attempts: 0,
                retry_backoff_base_ms: 1,
                retry_backoff_cap_ms: 2,
                failover_enabled: false,
            },
        ))
    }

    fn fetcher_returning(price: Decimal) -> PriceFetcher {
        Arc::new(move |_provider, _token| {
            Box::pin(async move {
                Ok(RawPriceQuote {
                    unit_price: price,
                    volume_24h: dec!(1_000_000),
                    change_24h_pct: dec!(0),
                })
            })
        })
    }

    #[tokio::test]
    async fn refresh_then_get_price_returns_fresh_point() {
        let oracle = PriceOracle::new(coordinator(), fetcher_returning(dec!(1.5)), 30_000, dec!(2));
        let token = Address::zero();
        oracle.refresh(137, token, 1_000).await;
        let price = oracle.get_price(137, token, 1_500).unwrap();
        assert_eq!(price.unit_price, dec!(1.5));
    }

    #[tokio::test]
    async fn stale_price_is_not_returned() {
        let oracle = PriceOracle::new(coordinator(), fetcher_returning(dec!(1.5)), 1_000, dec!(2));
        let token = Address::zero();
        oracle.refresh(137, token, 0).await;
        assert!(oracle.get_price(137, token, 5_000).is_none());
    }

    #[tokio::test]
    async fn older_snapshot_is_discarded() {
        let oracle = PriceOracle::new(coordinator(), fetcher_returning(dec!(2.0)), 30_000, dec!(2));
        let token = Address::zero();
        oracle.refresh(137, token, 10_000).await;
        oracle.refresh(137, token, 5_000).await; // older timestamp, should be dropped
        let price = oracle.get_price(137, token, 10_500).unwrap();
        assert_eq!(price.observed_at_ms, 10_000);
    }
}
