//! # Venue Adapter (C3)
//!
//! A tagged union over the supported DEX kinds (Uniswap V2-style constant
//! product, Uniswap V3-style concentrated liquidity). Each variant wraps
//! its router/quoter ABI binding and exposes the three operations
//! SPEC_FULL.md §4.3 names: `quote`, `build_swap_call`, `fee_bps`.
//!
//! ## Integration Points
//!
//! - **Input Sources**: `flasharb_types::Venue` entries from the configuration
//!   document; RPC responses for on-chain view calls.
//! - **Output Destinations**: the Opportunity Scanner (C6) calls `quote` for
//!   candidate sizing; the Flash-Loan Orchestrator (C8) calls
//!   `build_swap_call` when assembling the inner callback payload.

mod abi;
mod adapter;
mod error;

pub use abi::{IUniswapV2Router, IUniswapV3Quoter, IUniswapV3Router};
pub use adapter::{HttpProvider, VenueAdapter};
pub use error::VenueError;
