use crate::ids::ChainId;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// The closed set of lending protocols the Flash-Loan Provider Adapter (C4)
/// implements. Tagged union for the same reason as `VenueKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    AaveV3,
    Balancer,
}

/// Flash-loan provider descriptor bound to a chain. Immutable after
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashLoanProvider {
    pub key: String,
    pub chain_id: ChainId,
    pub kind: ProviderKind,
    pub pool_address: Address,
    pub fee_bps: u32,
    pub supported_tokens: Vec<Address>,
    /// Gas-unit hint used by the estimator (§4.5 gasCost term).
    pub gas_units_hint: u64,
}
