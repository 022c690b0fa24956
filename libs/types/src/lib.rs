//! # Flasharb Types — shared data model
//!
//! The entities and invariants every other crate in this workspace builds
//! on: static descriptors (`Chain`, `Token`, `Venue`, `FlashLoanProvider`),
//! transient market data (`PricePoint`, `VenueQuote`), the candidate/action
//! pair (`Opportunity`, `Execution`), and the process-wide bookkeeping types
//! (`CircuitBreaker`, `ProviderHealth`, `Budget`). No component-specific
//! logic lives here — just the shapes and the invariants cheap enough to
//! check locally (state-machine legality, weight clamping, budget
//! rollover).

pub mod breaker;
pub mod budget;
pub mod chain;
pub mod execution;
pub mod health;
pub mod ids;
pub mod opportunity;
pub mod price;
pub mod provider;
pub mod telemetry;
pub mod venue;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use budget::Budget;
pub use chain::{Chain, Token};
pub use execution::{Execution, ExecutionState, InvalidTransition, TerminalReason};
pub use health::{Capability, LoadBalancingPolicy, PriorityTier, ProviderHealth};
pub use ids::{ChainId, ExecutionId, IdGenerator, OpportunityId};
pub use opportunity::{rank_key, EstimatorOutput, Opportunity, Recommendation};
pub use price::{PricePoint, VenueQuote};
pub use provider::{FlashLoanProvider, ProviderKind};
pub use telemetry::TelemetryEvent;
pub use venue::{Venue, VenueKind};

pub use rust_decimal::Decimal;
