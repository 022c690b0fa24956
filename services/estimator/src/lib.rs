//! # Profit Estimator (C5)
//!
//! A pure function: no I/O, no shared state, no async. Given a candidate's
//! priced inputs it produces the full profitability breakdown SPEC_FULL.md
//! §4.5 tabulates. Every monetary computation uses `rust_decimal::Decimal`
//! so sub-basis-point margins survive the arithmetic, matching this
//! stack's existing convention in `flasharb_amm::optimal_size`.
//!
//! ## Integration Points
//!
//! - **Input Sources**: the Opportunity Scanner (C6) builds an
//!   `EstimatorInput` per candidate from venue quotes, the Price Oracle's
//!   native-asset price, and configured fee/liquidity figures.
//! - **Output Destinations**: the resulting `EstimatorOutput` is embedded
//!   into the `Opportunity` the Execution Queue (C7) ranks and the Risk
//!   Supervisor (C9) admits.

use flasharb_types::{EstimatorOutput, Recommendation};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Tuning the estimator reads at construction; mirrors the relevant slice
/// of `flasharb_config::RiskConfig`/`ScannerConfig` without this crate
/// depending on the configuration crate directly, keeping `estimate` free
/// of any I/O-adjacent dependency.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub min_margin_bps: u32,
    pub max_slippage_bps: u32,
    pub reserve_fraction: Decimal,
    /// Gas price above this (same units as `EstimatorInput::gas_price`)
    /// triggers the confidence penalty.
    pub gas_price_ceiling: Decimal,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_margin_bps: 25,
            max_slippage_bps: 10,
            reserve_fraction: dec!(0.0005),
            gas_price_ceiling: dec!(500),
        }
    }
}

/// One candidate's priced inputs. Token amounts and prices must already be
/// normalized to a common reference currency with decimal precision
/// (§4.5: "ratios are computed against a common reference currency with
/// sufficient precision to distinguish sub-basis-point margins").
#[derive(Debug, Clone)]
pub struct EstimatorInput {
    /// Per-unit price difference between the sell and buy venues, in the
    /// reference currency.
    pub price_delta: Decimal,
    pub trade_size: Decimal,
    /// Gas price in native-token units per gas unit (already converted
    /// from wei/gwei by the caller).
    pub gas_price: Decimal,
    pub gas_units_total: Decimal,
    pub native_price_usd: Decimal,
    pub provider_fee_bps: u32,
    pub venue_fee_bps_a: u32,
    pub venue_fee_bps_b: u32,
    pub depth_a: Decimal,
    pub depth_b: Decimal,
}

const SLIPPAGE_K: Decimal = dec!(0.5);
const CONFIDENCE_FLOOR: Decimal = dec!(0.1);
const DEPTH_PENALTY_MULTIPLE: Decimal = dec!(10);
const LOW_MARGIN_PENALTY_THRESHOLD_BPS: Decimal = dec!(50);
const STRONG_BUY_THRESHOLD_BPS: Decimal = dec!(100);
const BUY_THRESHOLD_BPS: Decimal = dec!(50);
const BPS_DENOMINATOR: Decimal = dec!(10000);

/// The pure estimation function (§4.5's table, computed field-by-field).
pub fn estimate(input: &EstimatorInput, config: &EstimatorConfig) -> EstimatorOutput {
    let gross_profit = input.price_delta * input.trade_size;
    let gas_cost = input.gas_units_total * input.gas_price * input.native_price_usd;
    let loan_fee = input.trade_size * Decimal::from(input.provider_fee_bps) / BPS_DENOMINATOR;
    let venue_fees = input.trade_size
        * Decimal::from(input.venue_fee_bps_a + input.venue_fee_bps_b)
        / BPS_DENOMINATOR;

    let max_slippage_fraction = Decimal::from(config.max_slippage_bps) / BPS_DENOMINATOR;
    let raw_slippage_fraction = if input.depth_a > Decimal::ZERO && input.depth_b > Decimal::ZERO {
        input.trade_size / input.depth_a * SLIPPAGE_K + input.trade_size / input.depth_b * SLIPPAGE_K
    } else {
        max_slippage_fraction
    };
    let slippage = raw_slippage_fraction.min(max_slippage_fraction) * input.trade_size;

    let reserve_buffer = input.trade_size * config.reserve_fraction;

    let net_profit = gross_profit - (gas_cost + loan_fee + venue_fees + slippage + reserve_buffer);

    let net_margin_bps = if input.trade_size > Decimal::ZERO {
        net_profit / input.trade_size * BPS_DENOMINATOR
    } else {
        Decimal::ZERO
    };

    let profitable = net_margin_bps >= Decimal::from(config.min_margin_bps);

    let mut confidence = Decimal::ONE;
    if input.gas_price > config.gas_price_ceiling {
        confidence *= dec!(0.8);
    }
    let min_depth = input.depth_a.min(input.depth_b);
    if min_depth < DEPTH_PENALTY_MULTIPLE * input.trade_size {
        confidence *= dec!(0.6);
    }
    if net_margin_bps < LOW_MARGIN_PENALTY_THRESHOLD_BPS {
        confidence *= dec!(0.7);
    }
    confidence = confidence.max(CONFIDENCE_FLOOR);

    let recommendation = if net_margin_bps >= STRONG_BUY_THRESHOLD_BPS {
        Recommendation::StrongBuy
    } else if net_margin_bps >= BUY_THRESHOLD_BPS {
        Recommendation::Buy
    } else if net_margin_bps >= Decimal::from(config.min_margin_bps) {
        Recommendation::WeakBuy
    } else {
        Recommendation::Pass
    };

    EstimatorOutput {
        gross_profit,
        gas_cost,
        loan_fee,
        venue_fees,
        slippage,
        reserve_buffer,
        net_profit,
        net_margin_bps,
        profitable,
        confidence,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> EstimatorInput {
        EstimatorInput {
            price_delta: dec!(0.02),
            trade_size: dec!(10000),
            gas_price: dec!(50),
            gas_units_total: dec!(0.000001),
            native_price_usd: dec!(1),
            provider_fee_bps: 9,
            venue_fee_bps_a: 30,
            venue_fee_bps_b: 30,
            depth_a: dec!(1_000_000),
            depth_b: dec!(1_000_000),
        }
    }

    #[test]
    fn profitable_trade_recommends_buy_tier() {
        let output = estimate(&sample_input(), &EstimatorConfig::default());
        assert!(output.profitable);
        assert!(output.recommendation.is_actionable());
        assert_eq!(output.gross_profit, dec!(200));
    }

    #[test]
    fn thin_liquidity_penalizes_confidence() {
        let mut input = sample_input();
        input.depth_a = dec!(5000);
        input.depth_b = dec!(5000);
        let output = estimate(&input, &EstimatorConfig::default());
        assert!(output.confidence < dec!(1.0));
    }

    #[test]
    fn excess_gas_price_penalizes_confidence() {
        let mut input = sample_input();
        input.gas_price = dec!(1000);
        let output = estimate(&input, &EstimatorConfig::default());
        assert!(output.confidence <= dec!(0.8));
    }

    #[test]
    fn unprofitable_trade_recommends_pass() {
        let mut input = sample_input();
        input.price_delta = dec!(0.0001);
        let output = estimate(&input, &EstimatorConfig::default());
        assert!(!output.profitable);
        assert_eq!(output.recommendation, flasharb_types::Recommendation::Pass);
    }

    #[test]
    fn confidence_never_drops_below_floor() {
        let mut input = sample_input();
        input.gas_price = dec!(100000);
        input.depth_a = dec!(1);
        input.depth_b = dec!(1);
        input.price_delta = dec!(-1);
        let output = estimate(&input, &EstimatorConfig::default());
        assert_eq!(output.confidence, CONFIDENCE_FLOOR);
    }
}
