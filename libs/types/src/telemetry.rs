use crate::execution::{ExecutionState, TerminalReason};
use crate::ids::{ChainId, ExecutionId, OpportunityId};
use rust_decimal::Decimal;

/// Structured events the Telemetry Sink (C10) emits at key transitions.
/// The sink itself is an external collaborator (SPEC_FULL.md §4.10); this
/// enum is the shared vocabulary every component uses to describe what
/// happened.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    OpportunityDetected {
        opportunity_id: OpportunityId,
        chain_id: ChainId,
        net_profit: Decimal,
    },
    OpportunityEnqueued {
        opportunity_id: OpportunityId,
        chain_id: ChainId,
    },
    OpportunityDropped {
        opportunity_id: OpportunityId,
        chain_id: ChainId,
    },
    ExecutionStateChanged {
        execution_id: ExecutionId,
        from: ExecutionState,
        to: ExecutionState,
        reason: Option<TerminalReason>,
    },
    ExecutionCompleted {
        execution_id: ExecutionId,
        outcome: ExecutionState,
        realized_margin: Decimal,
        gas_spent_native: Decimal,
    },
    BreakerOpened {
        subject: String,
    },
    BreakerClosed {
        subject: String,
    },
    ProviderHealthChanged {
        provider: String,
        healthy: bool,
    },
}
