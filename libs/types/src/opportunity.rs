use crate::ids::{ChainId, OpportunityId};
use ethers_core::types::Address;
use rust_decimal::Decimal;

/// The Profit Estimator's (C5) recommendation tier, derived from net margin
/// as a fraction of trade size. Thresholds per SPEC_FULL.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    WeakBuy,
    Pass,
}

impl Recommendation {
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Recommendation::Pass)
    }
}

/// Full output of the pure estimator function (§4.5). Embedded verbatim into
/// the `Opportunity` that carries it, so downstream consumers never need to
/// recompute it.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorOutput {
    pub gross_profit: Decimal,
    pub gas_cost: Decimal,
    pub loan_fee: Decimal,
    pub venue_fees: Decimal,
    pub slippage: Decimal,
    pub reserve_buffer: Decimal,
    pub net_profit: Decimal,
    pub net_margin_bps: Decimal,
    pub profitable: bool,
    pub confidence: Decimal,
    pub recommendation: Recommendation,
}

/// A candidate trade produced by the Scanner (C6). Once constructed every
/// field is read-only; `id` is unique for the process lifetime.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub chain_id: ChainId,
    pub token_a: Address,
    pub token_b: Address,
    pub buy_venue: String,
    pub sell_venue: String,
    pub provider_key: String,
    pub input_amount: Decimal,
    pub estimator: EstimatorOutput,
    pub detected_at_ms: i64,
}

impl Opportunity {
    pub fn net_profit(&self) -> Decimal {
        self.estimator.net_profit
    }
}

/// Total order used by the Execution Queue (C7) to rank opportunities
/// within a tick: higher net profit first, ties broken by higher
/// confidence, then by earlier detection timestamp (§4.6 tie-breaks).
pub fn rank_key(opp: &Opportunity) -> (Decimal, Decimal, std::cmp::Reverse<i64>) {
    (
        opp.estimator.net_profit,
        opp.estimator.confidence,
        std::cmp::Reverse(opp.detected_at_ms),
    )
}
