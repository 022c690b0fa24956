//! Conversions between on-chain 256-bit integer amounts and `Decimal`.
//!
//! Every quote and swap amount on the wire is a `U256` scaled by the
//! token's own decimals; every estimator field is a `Decimal` in a common
//! reference currency (SPEC_FULL.md §4.5). These two helpers are the single
//! crossing point so the scaling logic isn't duplicated across the Oracle,
//! Scanner and Orchestrator.

use ethers_core::types::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// `value` is a raw token amount (e.g. wei); returns it divided by
/// `10^decimals`. Values wider than `Decimal`'s ~28 significant digits
/// saturate rather than panic — token balances that large have no realistic
/// counterpart in this engine's trade sizes.
pub fn u256_to_decimal(value: U256, decimals: u8) -> Decimal {
    let raw = Decimal::from_str(&value.to_string()).unwrap_or(Decimal::MAX);
    let scale = Decimal::from(10u64.saturating_pow(decimals as u32));
    if scale.is_zero() {
        raw
    } else {
        raw / scale
    }
}

/// Inverse of [`u256_to_decimal`]: truncates to the token's decimals and
/// clamps negative input to zero (no amount the engine builds a call with
/// is ever negative).
pub fn decimal_to_u256(amount: Decimal, decimals: u8) -> U256 {
    let amount = amount.max(Decimal::ZERO);
    let scale = Decimal::from(10u64.saturating_pow(decimals as u32));
    let scaled = (amount * scale).trunc();
    U256::from_dec_str(&scaled.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_u256() {
        let amount = dec!(1234.56);
        let raw = decimal_to_u256(amount, 6);
        assert_eq!(raw, U256::from(1_234_560_000u64));
        assert_eq!(u256_to_decimal(raw, 6), amount);
    }

    #[test]
    fn zero_decimals_passes_through() {
        assert_eq!(decimal_to_u256(dec!(42), 0), U256::from(42));
    }

    #[test]
    fn negative_amount_clamps_to_zero() {
        assert_eq!(decimal_to_u256(dec!(-5), 18), U256::zero());
    }
}
