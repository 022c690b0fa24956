use crate::ids::{ChainId, ExecutionId, OpportunityId};
use ethers_core::types::{H256, U256};
use rust_decimal::Decimal;

/// The Flash-Loan Orchestrator's (C8) state machine, §4.8. Transitions are
/// monotone forward; `Succeeded`, `Reverted` and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Created,
    Admitting,
    Building,
    Simulating,
    Submitting,
    Pending,
    Succeeded,
    Reverted,
    Abandoned,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Reverted | ExecutionState::Abandoned
        )
    }

    /// True iff `next` is a legal forward transition from `self`. Used by
    /// the Orchestrator to assert property 3 of SPEC_FULL.md §8 (no
    /// backward transitions) even under a logic bug elsewhere.
    pub fn can_advance_to(&self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        matches!(
            (self, next),
            (Created, Admitting)
                | (Admitting, Building)
                | (Admitting, Abandoned)
                | (Building, Simulating)
                | (Building, Abandoned)
                | (Simulating, Submitting)
                | (Simulating, Abandoned)
                | (Submitting, Pending)
                | (Submitting, Abandoned)
                | (Pending, Succeeded)
                | (Pending, Reverted)
        )
    }
}

/// Why an Execution was abandoned or reverted, for telemetry and for C9's
/// counters (§4.9, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    AdmissionDenied,
    BuildFailure,
    EconomicReject,
    SimulationFailure,
    SimulationMode,
    SubmissionFailure,
    InsufficientLiquidity,
    BreakerOpen,
    BudgetExhausted,
    OperatorHalt,
    Reverted,
    InclusionTimeout,
    Succeeded,
}

/// An Opportunity promoted to action. Created on dequeue from C7, before
/// any irreversible work is done.
#[derive(Debug, Clone)]
pub struct Execution {
    pub id: ExecutionId,
    pub opportunity_id: OpportunityId,
    pub chain_id: ChainId,
    pub state: ExecutionState,
    pub tx_hash: Option<H256>,
    pub gas_used: Option<U256>,
    pub realized_margin: Option<Decimal>,
    pub terminal_reason: Option<TerminalReason>,
    pub created_at_ms: i64,
    pub finalized_at_ms: Option<i64>,
}

impl Execution {
    pub fn new(id: ExecutionId, opportunity_id: OpportunityId, chain_id: ChainId, now_ms: i64) -> Self {
        Self {
            id,
            opportunity_id,
            chain_id,
            state: ExecutionState::Created,
            tx_hash: None,
            gas_used: None,
            realized_margin: None,
            terminal_reason: None,
            created_at_ms: now_ms,
            finalized_at_ms: None,
        }
    }

    /// Advance to `next`, returning an error if the transition would go
    /// backward or skip the state machine's defined edges.
    pub fn transition(&mut self, next: ExecutionState) -> Result<(), InvalidTransition> {
        if !self.state.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn finalize(&mut self, reason: TerminalReason, now_ms: i64) {
        self.terminal_reason = Some(reason);
        self.finalized_at_ms = Some(now_ms);
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("invalid execution transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ExecutionState,
    pub to: ExecutionState,
}
