use crate::ids::ChainId;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static, startup-immutable descriptor of an EVM chain the engine trades
/// on. Lists the keys (not the full descriptors) of the venues, flash-loan
/// providers and tokens enabled on this chain; the engine resolves keys
/// against the registries built from the rest of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub block_time: Duration,
    pub venue_keys: Vec<String>,
    pub provider_keys: Vec<String>,
    pub token_keys: Vec<String>,
    /// Address of the external callback contract the Orchestrator (C8)
    /// targets as `receiver` when it builds a flash-loan borrow
    /// transaction on this chain.
    pub callback_receiver: Address,
}

impl Chain {
    pub fn block_time_ms(&self) -> u64 {
        self.block_time.as_millis() as u64
    }
}

/// Static, per-chain token descriptor. Immutable after startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Token {
    pub chain_id: ChainId,
    pub address: Address,
    pub decimals: u8,
}
