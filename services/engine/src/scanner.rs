//! # Opportunity Scanner (C6)
//!
//! One task per chain (§4.6), woken on `scanner.scan_period_ms`. Each tick
//! walks the chain's configured pairs, cross-checks every distinct pair of
//! venues through the Price Oracle (C2), and feeds anything the Profit
//! Estimator (C5) judges profitable into the Execution Queue (C7).
//!
//! Pure sizing/ranking helpers are free functions so they can be exercised
//! without a live provider or RPC endpoint; `tick()` itself is the
//! network-dependent glue around them.

use ethers::providers::Middleware;
use ethers_core::types::{Address, U256};
use flasharb_config::{PairConfig, ScannerConfig};
use flasharb_estimator::{estimate, EstimatorConfig, EstimatorInput};
use flasharb_flashloan::FlashLoanAdapter;
use flasharb_types::{ChainId, IdGenerator, Opportunity, TelemetryEvent};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::oracle::{OracleError, PriceOracle};
use crate::queue::ExecutionQueue;
use crate::registry::ChainRuntime;
use crate::telemetry::TelemetrySink;
use crate::units::{decimal_to_u256, u256_to_decimal};

const BPS_DENOMINATOR: Decimal = rust_decimal_macros::dec!(10000);

/// USD notional for one tick's candidate trade, bounded below by the pair's
/// configured floor and above by the scanner's hard cap (§4.6 step 2).
pub fn size_trade(
    volume_24h_usd: Decimal,
    fraction_of_volume: Decimal,
    hard_cap_usd: Decimal,
    min_trade_size_usd: Decimal,
) -> Decimal {
    (volume_24h_usd * fraction_of_volume)
        .min(hard_cap_usd)
        .max(min_trade_size_usd)
}

/// Basis-point spread between two same-direction implied prices, always
/// non-negative; callers pass `high`/`low` already ordered.
pub fn diff_bps(low: Decimal, high: Decimal) -> Decimal {
    if low <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (high - low) / low * BPS_DENOMINATOR
}

/// Picks the pair's preferred flash-loan provider if it supports `token` and
/// is present, otherwise the supporting provider with the lowest fee
/// (§4.6 step 4: "the cheapest flash-loan provider that can supply the
/// borrowed token").
pub fn select_provider<'a>(
    providers: &'a HashMap<String, FlashLoanAdapter>,
    token: Address,
    preferred_key: Option<&str>,
) -> Option<(&'a str, &'a FlashLoanAdapter)> {
    if let Some(key) = preferred_key {
        if let Some(adapter) = providers.get(key) {
            if adapter.provider().supported_tokens.contains(&token) {
                return Some((key.as_ref(), adapter));
            }
        }
    }
    providers
        .iter()
        .filter(|(_, adapter)| adapter.provider().supported_tokens.contains(&token))
        .min_by_key(|(_, adapter)| adapter.fee_basis_points())
        .map(|(key, adapter)| (key.as_str(), adapter))
}

pub struct Scanner {
    chain_id: ChainId,
    runtime: Arc<ChainRuntime>,
    oracle: Arc<PriceOracle>,
    queue: Arc<ExecutionQueue>,
    telemetry: TelemetrySink,
    id_gen: Arc<IdGenerator>,
    pairs: Vec<PairConfig>,
    scanner_config: ScannerConfig,
    estimator_config: EstimatorConfig,
}

impl Scanner {
    pub fn new(
        chain_id: ChainId,
        runtime: Arc<ChainRuntime>,
        oracle: Arc<PriceOracle>,
        queue: Arc<ExecutionQueue>,
        telemetry: TelemetrySink,
        id_gen: Arc<IdGenerator>,
        pairs: Vec<PairConfig>,
        scanner_config: ScannerConfig,
        estimator_config: EstimatorConfig,
    ) -> Self {
        Self {
            chain_id,
            runtime,
            oracle,
            queue,
            telemetry,
            id_gen,
            pairs,
            scanner_config,
            estimator_config,
        }
    }

    /// Drives `tick()` on `scanner.scan_period_ms` until the task is
    /// aborted. Kept thin so `tick()` alone carries the scanning logic.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.scanner_config.scan_period_ms));
        loop {
            interval.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis();
            if let Err(err) = self.tick(now_ms).await {
                tracing::warn!(chain_id = self.chain_id, error = %err, "scanner tick failed");
            }
        }
    }

    /// One scan pass over every configured pair on this chain (§4.6).
    pub async fn tick(&self, now_ms: i64) -> anyhow::Result<()> {
        let gas_price_wei = self.runtime.client.get_gas_price().await?;
        let gas_price_ceiling_wei = U256::from(self.scanner_config.gas_price_ceiling_gwei) * U256::exp10(9);
        if gas_price_wei > gas_price_ceiling_wei {
            tracing::debug!(chain_id = self.chain_id, "gas price above ceiling, skipping tick");
            return Ok(());
        }
        let gas_price_native = u256_to_decimal(gas_price_wei, 18);

        let mut candidates = Vec::new();
        for pair in &self.pairs {
            if let Some(opportunities) = self.scan_pair(pair, gas_price_native, now_ms).await {
                candidates.extend(opportunities);
            }
        }

        candidates.sort_by(|a, b| {
            flasharb_types::rank_key(b)
                .partial_cmp(&flasharb_types::rank_key(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.scanner_config.top_k);

        for opportunity in candidates {
            self.telemetry.emit(TelemetryEvent::OpportunityDetected {
                opportunity_id: opportunity.id,
                chain_id: opportunity.chain_id,
                net_profit: opportunity.estimator.net_profit,
            });
            self.queue.enqueue(opportunity, &self.telemetry);
        }

        Ok(())
    }

    async fn scan_pair(&self, pair: &PairConfig, gas_price_native: Decimal, now_ms: i64) -> Option<Vec<Opportunity>> {
        let token_a = self.runtime.tokens.get(&pair.token_a_symbol)?;
        let token_b = self.runtime.tokens.get(&pair.token_b_symbol)?;

        let price_a = self.oracle.get_price(self.chain_id, token_a.address, now_ms)?;
        if price_a.volume_24h < pair.min_volume_usd_floor {
            return None;
        }

        let trade_size_usd = size_trade(
            price_a.volume_24h,
            self.scanner_config.trade_size_fraction_of_volume,
            self.scanner_config.trade_size_hard_cap_usd,
            pair.min_trade_size_usd,
        );

        let trade_size_native = trade_size_usd / price_a.unit_price.max(Decimal::new(1, 18));
        let amount_in_raw = decimal_to_u256(trade_size_native, token_a.decimals);

        let venue_keys: Vec<&String> = self.runtime.venues.keys().collect();
        let mut opportunities = Vec::new();

        for i in 0..venue_keys.len() {
            for j in (i + 1)..venue_keys.len() {
                let key_i = venue_keys[i];
                let key_j = venue_keys[j];
                let venue_i = &self.runtime.venues[key_i];
                let venue_j = &self.runtime.venues[key_j];

                let quote_i = self
                    .oracle
                    .cross_checked_quote(
                        self.chain_id,
                        key_i,
                        venue_i,
                        token_a.address,
                        token_b.address,
                        trade_size_native,
                        amount_in_raw,
                        now_ms,
                    )
                    .await;
                let quote_j = self
                    .oracle
                    .cross_checked_quote(
                        self.chain_id,
                        key_j,
                        venue_j,
                        token_a.address,
                        token_b.address,
                        trade_size_native,
                        amount_in_raw,
                        now_ms,
                    )
                    .await;

                let (quote_i, quote_j) = match (quote_i, quote_j) {
                    (Ok(a), Ok(b)) => (a, b),
                    (Err(OracleError::Stale(_)), _) | (_, Err(OracleError::Stale(_))) => continue,
                    _ => continue,
                };

                let (Some(price_i), Some(price_j)) = (quote_i.implied_price(), quote_j.implied_price()) else {
                    continue;
                };

                let (low_key, low_venue, high_key) = if price_i <= price_j {
                    (key_i, venue_i, key_j)
                } else {
                    (key_j, venue_j, key_i)
                };
                let (low_price, high_price) = if price_i <= price_j {
                    (price_i, price_j)
                } else {
                    (price_j, price_i)
                };
                let _ = low_venue;

                let spread_bps = diff_bps(low_price, high_price);
                if spread_bps < self.scanner_config.min_diff_bps_floor {
                    continue;
                }

                let Some((provider_key, provider_adapter)) = select_provider(
                    &self.runtime.providers,
                    token_a.address,
                    pair.preferred_provider_key.as_deref(),
                ) else {
                    continue;
                };

                let native_price_usd = self
                    .runtime
                    .native_token
                    .and_then(|addr| self.oracle.get_price(self.chain_id, addr, now_ms))
                    .map(|p| p.unit_price)
                    .unwrap_or(Decimal::ONE);

                let input = EstimatorInput {
                    price_delta: high_price - low_price,
                    trade_size: trade_size_native,
                    gas_price: gas_price_native,
                    gas_units_total: Decimal::from(provider_adapter.provider().gas_units_hint),
                    native_price_usd,
                    provider_fee_bps: provider_adapter.fee_basis_points(),
                    venue_fee_bps_a: venue_i.fee_bps(),
                    venue_fee_bps_b: venue_j.fee_bps(),
                    depth_a: price_a.volume_24h,
                    depth_b: price_a.volume_24h,
                };
                let output = estimate(&input, &self.estimator_config);

                if !output.profitable || output.confidence < self.scanner_config.confidence_floor {
                    continue;
                }

                opportunities.push(Opportunity {
                    id: self.id_gen.next(),
                    chain_id: self.chain_id,
                    token_a: token_a.address,
                    token_b: token_b.address,
                    buy_venue: low_key.clone(),
                    sell_venue: high_key.clone(),
                    provider_key: provider_key.to_string(),
                    input_amount: trade_size_usd,
                    estimator: output,
                    detected_at_ms: now_ms,
                });
            }
        }

        Some(opportunities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trade_size_respects_floor_and_cap() {
        assert_eq!(size_trade(dec!(1_000_000), dec!(0.01), dec!(50_000), dec!(100)), dec!(10_000));
        assert_eq!(size_trade(dec!(1_000), dec!(0.01), dec!(50_000), dec!(100)), dec!(100));
        assert_eq!(size_trade(dec!(100_000_000), dec!(0.01), dec!(50_000), dec!(100)), dec!(50_000));
    }

    #[test]
    fn diff_bps_computes_spread() {
        assert_eq!(diff_bps(dec!(100), dec!(101)), dec!(100));
        assert_eq!(diff_bps(dec!(0), dec!(10)), dec!(0));
    }

    #[test]
    fn select_provider_prefers_configured_key_when_eligible() {
        use ethers::providers::{Http, Provider};
        use flasharb_types::{FlashLoanProvider, ProviderKind};

        let client = Arc::new(Provider::<Http>::try_from("http://localhost:8545").unwrap());
        let token = Address::from_low_u64_be(1);
        let mut providers = HashMap::new();
        providers.insert(
            "cheap".to_string(),
            FlashLoanAdapter::new(
                FlashLoanProvider {
                    key: "cheap".into(),
                    chain_id: 137,
                    kind: ProviderKind::AaveV3,
                    pool_address: Address::zero(),
                    fee_bps: 5,
                    supported_tokens: vec![token],
                    gas_units_hint: 200_000,
                },
                client.clone(),
            ),
        );
        providers.insert(
            "expensive".to_string(),
            FlashLoanAdapter::new(
                FlashLoanProvider {
                    key: "expensive".into(),
                    chain_id: 137,
                    kind: ProviderKind::Balancer,
                    pool_address: Address::zero(),
                    fee_bps: 9,
                    supported_tokens: vec![token],
                    gas_units_hint: 200_000,
                },
                client,
            ),
        );

        let (key, _) = select_provider(&providers, token, None).unwrap();
        assert_eq!(key, "cheap");

        let (key, _) = select_provider(&providers, token, Some("expensive")).unwrap();
        assert_eq!(key, "expensive");
    }
}
