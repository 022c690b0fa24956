use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-chain, per-UTC-day accounting the Risk Supervisor (C9) consults
/// before admitting an Execution. Resets at day rollover rather than being
/// mutated in place, so a stale `Budget` can never silently carry over
/// yesterday's spend.
#[derive(Debug, Clone)]
pub struct Budget {
    pub day: NaiveDate,
    pub gas_spent_native: Decimal,
    pub trades_submitted: u64,
    pub realized_margin_sum: Decimal,
    pub daily_gas_cap_native: Decimal,
}

impl Budget {
    pub fn new(day: NaiveDate, daily_gas_cap_native: Decimal) -> Self {
        Self {
            day,
            gas_spent_native: dec!(0),
            trades_submitted: 0,
            realized_margin_sum: dec!(0),
            daily_gas_cap_native,
        }
    }

    /// Roll over to `today` if it differs from the tracked day, zeroing
    /// counters. No-op if already current.
    pub fn roll_over_if_needed(&mut self, today: NaiveDate) {
        if self.day != today {
            self.day = today;
            self.gas_spent_native = dec!(0);
            self.trades_submitted = 0;
            self.realized_margin_sum = dec!(0);
        }
    }

    pub fn headroom_native(&self) -> Decimal {
        (self.daily_gas_cap_native - self.gas_spent_native).max(dec!(0))
    }

    /// Admission requires headroom greater than twice the estimated gas
    /// cost (§4.9 rule 3).
    pub fn has_headroom_for(&self, estimated_gas_native: Decimal) -> bool {
        self.headroom_native() > estimated_gas_native * dec!(2)
    }

    pub fn record_execution(&mut self, gas_spent_native: Decimal, realized_margin: Decimal) {
        self.gas_spent_native += gas_spent_native;
        self.trades_submitted += 1;
        self.realized_margin_sum += realized_margin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_headroom_below_double_estimate() {
        let mut budget = Budget::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), dec!(10));
        budget.gas_spent_native = dec!(9);
        assert!(!budget.has_headroom_for(dec!(1)));
    }

    #[test]
    fn rollover_zeroes_counters() {
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let mut budget = Budget::new(day1, dec!(100));
        budget.record_execution(dec!(5), dec!(2));
        budget.roll_over_if_needed(day2);
        assert_eq!(budget.gas_spent_native, dec!(0));
        assert_eq!(budget.trades_submitted, 0);
    }
}
