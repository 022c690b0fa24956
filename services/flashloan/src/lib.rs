//! # Flash-Loan Provider Adapter (C4)
//!
//! A tagged union over the supported lending protocols (Aave V3, Balancer).
//! Each variant exposes the four operations SPEC_FULL.md §4.4 names:
//! `fee_basis_points`, `max_borrow`, `build_borrow_tx`, `is_healthy`.
//!
//! ## Integration Points
//!
//! - **Input Sources**: `flasharb_types::FlashLoanProvider` entries from the
//!   configuration document; RPC responses for on-chain reads.
//! - **Output Destinations**: the Profit Estimator (C5) reads `fee_basis_points`
//!   and `max_borrow`; the Flash-Loan Orchestrator (C8) calls `build_borrow_tx`
//!   when assembling the outer transaction, and `is_healthy` during admission.

mod abi;
mod adapter;
mod error;

pub use abi::{IAavePool, IAavePoolDataProvider, IBalancerVault, IERC20};
pub use adapter::{FlashLoanAdapter, FlashLoanTx, HttpProvider};
pub use error::FlashLoanError;
