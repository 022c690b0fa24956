//! # Risk Supervisor (C9)
//!
//! Owns the global kill-switch and, per chain, a revert counter, a daily
//! [`Budget`], an admission cooldown and a breach cooldown (SPEC_FULL.md
//! §4.9). `admit` evaluates the four admission rules conjunctively; a
//! terminal [`ExecutionState`] is fed back through `record_terminal` so the
//! next admission decision sees its effect.

use chrono::Utc;
use dashmap::DashMap;
use flasharb_types::{Budget, ChainId, ExecutionState, TelemetryEvent};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    KillSwitch,
    BreakerOpen,
    RevertThreshold,
    BudgetExhausted,
    AdmissionCooldown,
}

struct ChainRiskState {
    budget: Mutex<Budget>,
    recent_reverts: Mutex<VecDeque<i64>>,
    last_admission_ms: Mutex<Option<i64>>,
    deny_until_ms: Mutex<Option<i64>>,
}

pub struct RiskSupervisorConfig {
    pub revert_threshold: u32,
    pub revert_window_ms: i64,
    pub admission_cooldown_ms: i64,
    pub breaker_cooldown_ms: i64,
}

impl From<&flasharb_config::RiskConfig> for RiskSupervisorConfig {
    fn from(c: &flasharb_config::RiskConfig) -> Self {
        Self {
            revert_threshold: c.revert_threshold,
            revert_window_ms: c.revert_window_secs as i64 * 1000,
            admission_cooldown_ms: c.admission_cooldown_ms as i64,
            breaker_cooldown_ms: c.breaker_cooldown_secs as i64 * 1000,
        }
    }
}

/// Process-wide singleton (SPEC_FULL.md §9 "Global state"): constructed
/// once at startup, shared by every Scanner and Executor task via `Arc`.
pub struct RiskSupervisor {
    kill_switch: Arc<AtomicBool>,
    chains: DashMap<ChainId, ChainRiskState>,
    config: RiskSupervisorConfig,
}

impl RiskSupervisor {
    pub fn new(config: RiskSupervisorConfig, chain_budgets: Vec<(ChainId, Decimal)>) -> Self {
        let chains = DashMap::new();
        let today = Utc::now().date_naive();
        for (chain_id, daily_cap) in chain_budgets {
            chains.insert(
                chain_id,
                ChainRiskState {
                    budget: Mutex::new(Budget::new(today, daily_cap)),
                    recent_reverts: Mutex::new(VecDeque::new()),
                    last_admission_ms: Mutex::new(None),
                    deny_until_ms: Mutex::new(None),
                },
            );
        }
        Self {
            kill_switch: Arc::new(AtomicBool::new(false)),
            chains,
            config,
        }
    }

    /// Shared handle an operator-command / signal-handler task can flip
    /// independently of holding a reference to the whole supervisor.
    pub fn kill_switch_handle(&self) -> Arc<AtomicBool> {
        self.kill_switch.clone()
    }

    pub fn set_kill_switch(&self, engaged: bool) {
        self.kill_switch.store(engaged, Ordering::SeqCst);
    }

    pub fn kill_switch_engaged(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    /// Evaluates the four admission rules of §4.9 conjunctively. On success,
    /// records the admission timestamp so the next call's cooldown check
    /// sees it.
    pub fn admit(
        &self,
        chain_id: ChainId,
        estimated_gas_native: Decimal,
        now_ms: i64,
    ) -> Result<(), DenialReason> {
        if self.kill_switch_engaged() {
            return Err(DenialReason::KillSwitch);
        }
        let Some(state) = self.chains.get(&chain_id) else {
            // An unconfigured chain has no budget to check against; treat
            // conservatively as budget-exhausted rather than silently admitting.
            return Err(DenialReason::BudgetExhausted);
        };

        if let Some(deny_until) = *state.deny_until_ms.lock() {
            if now_ms < deny_until {
                return Err(DenialReason::BreakerOpen);
            }
        }

        {
            let mut reverts = state.recent_reverts.lock();
            prune_older_than(&mut reverts, now_ms - self.config.revert_window_ms);
            if reverts.len() as u32 >= self.config.revert_threshold {
                return Err(DenialReason::RevertThreshold);
            }
        }

        {
            let mut budget = state.budget.lock();
            budget.roll_over_if_needed(Utc::now().date_naive());
            if !budget.has_headroom_for(estimated_gas_native) {
                return Err(DenialReason::BudgetExhausted);
            }
        }

        {
            let mut last = state.last_admission_ms.lock();
            if let Some(previous) = *last {
                if now_ms - previous < self.config.admission_cooldown_ms {
                    return Err(DenialReason::AdmissionCooldown);
                }
            }
            *last = Some(now_ms);
        }

        Ok(())
    }

    /// Feeds a terminal Execution's outcome back into the chain's counters.
    /// A `Reverted` outcome that pushes the chain past `revert_threshold`
    /// within the window opens the chain's admission deny for
    /// `breaker_cooldown_ms` and emits `BreakerOpened` (§4.9).
    pub fn record_terminal(
        &self,
        chain_id: ChainId,
        outcome: ExecutionState,
        gas_spent_native: Decimal,
        realized_margin: Decimal,
        now_ms: i64,
        telemetry: &TelemetrySink,
    ) {
        let Some(state) = self.chains.get(&chain_id) else {
            return;
        };

        state
            .budget
            .lock()
            .record_execution(gas_spent_native, realized_margin);

        if outcome == ExecutionState::Reverted {
            let mut reverts = state.recent_reverts.lock();
            reverts.push_back(now_ms);
            prune_older_than(&mut reverts, now_ms - self.config.revert_window_ms);
            if reverts.len() as u32 >= self.config.revert_threshold {
                *state.deny_until_ms.lock() = Some(now_ms + self.config.breaker_cooldown_ms);
                telemetry.emit(TelemetryEvent::BreakerOpened {
                    subject: format!("chain:{chain_id}"),
                });
            }
        }
    }

    pub fn budget_headroom(&self, chain_id: ChainId) -> Option<Decimal> {
        self.chains
            .get(&chain_id)
            .map(|s| s.budget.lock().headroom_native())
    }
}

fn prune_older_than(timestamps: &mut VecDeque<i64>, cutoff: i64) {
    while matches!(timestamps.front(), Some(t) if *t < cutoff) {
        timestamps.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> RiskSupervisorConfig {
        RiskSupervisorConfig {
            revert_threshold: 3,
            revert_window_ms: 3_600_000,
            admission_cooldown_ms: 500,
            breaker_cooldown_ms: 300_000,
        }
    }

    #[test]
    fn kill_switch_denies_all_admission() {
        let supervisor = RiskSupervisor::new(config(), vec![(137, dec!(100))]);
        supervisor.set_kill_switch(true);
        assert_eq!(
            supervisor.admit(137, dec!(1), 0),
            Err(DenialReason::KillSwitch)
        );
    }

    #[test]
    fn unconfigured_chain_is_denied() {
        let supervisor = RiskSupervisor::new(config(), vec![]);
        assert_eq!(
            supervisor.admit(1, dec!(1), 0),
            Err(DenialReason::BudgetExhausted)
        );
    }

    #[test]
    fn admission_cooldown_blocks_rapid_repeats() {
        let supervisor = RiskSupervisor::new(config(), vec![(137, dec!(1000))]);
        assert!(supervisor.admit(137, dec!(1), 0).is_ok());
        assert_eq!(
            supervisor.admit(137, dec!(1), 100),
            Err(DenialReason::AdmissionCooldown)
        );
        assert!(supervisor.admit(137, dec!(1), 600).is_ok());
    }

    #[test]
    fn budget_exhaustion_requires_double_headroom() {
        let supervisor = RiskSupervisor::new(config(), vec![(137, dec!(10))]);
        let telemetry = TelemetrySink::new();
        // Spend down to 9/10; headroom (1) is not > 2x a 1-unit estimate.
        supervisor.record_terminal(
            137,
            ExecutionState::Succeeded,
            dec!(9),
            dec!(0),
            0,
            &telemetry,
        );
        assert_eq!(
            supervisor.admit(137, dec!(1), 10_000),
            Err(DenialReason::BudgetExhausted)
        );
    }

    #[test]
    fn third_revert_in_window_opens_chain_breaker() {
        let supervisor = RiskSupervisor::new(config(), vec![(137, dec!(1000))]);
        let telemetry = TelemetrySink::new();
        let mut rx = telemetry.subscribe();
        for t in [0, 1000, 2000] {
            supervisor.record_terminal(137, ExecutionState::Reverted, dec!(1), dec!(0), t, &telemetry);
        }
        assert_eq!(
            supervisor.admit(137, dec!(1), 2500),
            Err(DenialReason::BreakerOpen)
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            flasharb_types::TelemetryEvent::BreakerOpened { .. }
        ));
    }

    #[test]
    fn reverts_outside_window_are_pruned() {
        let supervisor = RiskSupervisor::new(config(), vec![(137, dec!(1000))]);
        let telemetry = TelemetrySink::new();
        supervisor.record_terminal(137, ExecutionState::Reverted, dec!(1), dec!(0), 0, &telemetry);
        supervisor.record_terminal(137, ExecutionState::Reverted, dec!(1), dec!(0), 1000, &telemetry);
        // Third revert arrives long after the window has elapsed for the first two.
        supervisor.record_terminal(
            137,
            ExecutionState::Reverted,
            dec!(1),
            dec!(0),
            10_000_000,
            &telemetry,
        );
        assert!(supervisor.admit(137, dec!(1), 10_000_600).is_ok());
    }
}
