use crate::ids::ChainId;
use ethers_core::types::Address;
use rust_decimal::Decimal;

/// Fused, off-chain price for a single token against a reference currency
/// (USD). Transient; owned by the Price Oracle (C2); evicted by age. Never
/// mutated after construction — a refresh produces a new `PricePoint`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub unit_price: Decimal,
    pub volume_24h: Decimal,
    pub change_24h_pct: Decimal,
    pub provider: String,
    /// Monotonic per-token timestamp (milliseconds since epoch). C2 drops
    /// any snapshot whose timestamp is not strictly greater than the last
    /// accepted one for the same token.
    pub observed_at_ms: i64,
}

impl PricePoint {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.observed_at_ms).max(0)
    }

    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        self.age_ms(now_ms) <= ttl_ms
    }
}

/// On-chain swap quote observed from a specific venue at a specific block.
/// Owned by C2's cache; age-bounded the same way as `PricePoint`.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueQuote {
    pub chain_id: ChainId,
    pub venue_key: String,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub block_number: u64,
    pub observed_at_ms: i64,
}

impl VenueQuote {
    /// Implied unit price of `token_out` per `token_in` from this quote.
    pub fn implied_price(&self) -> Option<Decimal> {
        if self.amount_in.is_zero() {
            None
        } else {
            Some(self.amount_out / self.amount_in)
        }
    }
}
