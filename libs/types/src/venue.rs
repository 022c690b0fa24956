use crate::ids::ChainId;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

/// The closed set of exchange protocols the Venue Adapter (C3) implements.
/// A tagged union rather than a trait object: the set of venue kinds is
/// small and closed, and keeping it a sum type lets match arms be checked
/// exhaustively at compile time (see SPEC_FULL.md §9, Dynamic dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    UniswapV2,
    UniswapV3,
}

/// Exchange descriptor bound to a chain. Immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub key: String,
    pub chain_id: ChainId,
    pub kind: VenueKind,
    pub router: Address,
    pub factory: Address,
    pub fee_bps: u32,
}
