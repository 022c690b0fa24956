//! Process-lifetime identifiers.
//!
//! Opportunity and Execution ids are monotonically increasing counters, not
//! UUIDs: the spec only requires uniqueness "for the process lifetime", and
//! an `AtomicU64` counter is cheaper and trivially reproducible in tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// EVM chain id, e.g. 1 (Ethereum), 137 (Polygon), 42161 (Arbitrum).
pub type ChainId = u64;

/// Unique id of an `Opportunity`, scoped to process lifetime.
pub type OpportunityId = u64;

/// Unique id of an `Execution`, scoped to process lifetime.
pub type ExecutionId = u64;

/// Monotonic, thread-safe id generator shared by the Scanner (opportunity
/// ids) and the Orchestrator (execution ids).
#[derive(Debug, Default)]
pub struct IdGenerator(AtomicU64);

impl IdGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
