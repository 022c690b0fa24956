//! The Engine crate: Price Oracle (C2), Opportunity Scanner (C6), Execution
//! Queue (C7), Flash-Loan Orchestrator (C8), Risk Supervisor (C9) and
//! Telemetry Sink (C10), plus the adapter registry that ties them to a
//! chain's configured venues and flash-loan providers. `main.rs` is the
//! only consumer that wires every module together into a running process;
//! everything here is constructed explicitly, with no global state beyond
//! what the caller holds in an `Arc`.

pub mod oracle;
pub mod orchestrator;
pub mod queue;
pub mod registry;
pub mod risk;
pub mod scanner;
pub mod telemetry;
pub mod units;

pub use oracle::{OracleError, PriceFetcher, PriceOracle, RawPriceQuote};
pub use orchestrator::Orchestrator;
pub use queue::ExecutionQueue;
pub use registry::{ChainRuntime, EngineRegistry};
pub use risk::{DenialReason, RiskSupervisor, RiskSupervisorConfig};
pub use scanner::Scanner;
pub use telemetry::TelemetrySink;
