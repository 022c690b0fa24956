//! The Venue Adapter (C3): a tagged union over the supported DEX kinds,
//! each producing a quote via an on-chain view call and a swap calldata
//! payload for the flash-loan callback contract to execute.

use crate::abi::{ExactInputSingleCall, IUniswapV2Router, IUniswapV3Quoter, IUniswapV3Router};
use crate::error::VenueError;
use ethers::abi::AbiEncode;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, U256};
use flasharb_types::{Venue, VenueKind};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub type HttpProvider = Provider<Http>;

/// One registered exchange, bound to its client and router/quoter bindings.
pub enum VenueAdapter {
    UniswapV2 {
        venue: Venue,
        router: IUniswapV2Router<HttpProvider>,
    },
    UniswapV3 {
        venue: Venue,
        quoter: IUniswapV3Quoter<HttpProvider>,
        router: IUniswapV3Router<HttpProvider>,
    },
}

impl VenueAdapter {
    pub fn new(venue: Venue, client: Arc<HttpProvider>, quoter_address: Option<Address>) -> Self {
        match venue.kind {
            VenueKind::UniswapV2 => {
                let router = IUniswapV2Router::new(venue.router, client);
                VenueAdapter::UniswapV2 { venue, router }
            }
            VenueKind::UniswapV3 => {
                let quoter_address = quoter_address.unwrap_or(venue.router);
                let quoter = IUniswapV3Quoter::new(quoter_address, client.clone());
                let router = IUniswapV3Router::new(venue.router, client);
                VenueAdapter::UniswapV3 {
                    venue,
                    quoter,
                    router,
                }
            }
        }
    }

    pub fn venue(&self) -> &Venue {
        match self {
            VenueAdapter::UniswapV2 { venue, .. } => venue,
            VenueAdapter::UniswapV3 { venue, .. } => venue,
        }
    }

    pub fn fee_bps(&self) -> u32 {
        self.venue().fee_bps
    }

    /// The contract address `build_swap_call`'s calldata must be sent to.
    pub fn router_address(&self) -> Address {
        match self {
            VenueAdapter::UniswapV2 { router, .. } => router.address(),
            VenueAdapter::UniswapV3 { router, .. } => router.address(),
        }
    }

    /// `quote(tokenIn, tokenOut, amountIn) -> amountOut`, a pure view call
    /// against the venue's own router/quoter (§4.3). For V3, the quoter
    /// contract is not marked `view` on-chain (it reverts to return data);
    /// ethers' generated `.call()` performs an `eth_call` regardless, so no
    /// state is mutated.
    pub async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256, VenueError> {
        match self {
            VenueAdapter::UniswapV2 { venue, router } => {
                let path = vec![token_in, token_out];
                let amounts = router
                    .get_amounts_out(amount_in, path)
                    .call()
                    .await
                    .map_err(|source| VenueError::QuoteFailed {
                        venue: venue.key.clone(),
                        source,
                    })?;
                amounts
                    .last()
                    .copied()
                    .ok_or_else(|| VenueError::EmptyAmountsPath {
                        venue: venue.key.clone(),
                    })
            }
            VenueAdapter::UniswapV3 { venue, quoter, .. } => {
                let fee_pips = venue.fee_bps * 100;
                let amount_out = quoter
                    .quote_exact_input_single(token_in, token_out, fee_pips, amount_in, U256::zero())
                    .call()
                    .await
                    .map_err(|source| VenueError::QuoteFailed {
                        venue: venue.key.clone(),
                        source,
                    })?;
                Ok(amount_out)
            }
        }
    }

    /// `buildSwapCall(tokenIn, tokenOut, amountIn, minAmountOut, deadline) ->
    /// callData` (§4.3). Pure ABI encoding; does not touch the network.
    /// Callers set `min_amount_out` from the estimator's slippage-adjusted
    /// expectation so the produced call reverts rather than under-filling.
    pub fn build_swap_call(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
        recipient: Address,
        deadline_secs_from_now: u64,
    ) -> Result<Bytes, VenueError> {
        let deadline = U256::from(now_unix_secs() + deadline_secs_from_now);
        match self {
            VenueAdapter::UniswapV2 { venue, router } => {
                let path = vec![token_in, token_out];
                let call = router.swap_exact_tokens_for_tokens(
                    amount_in,
                    min_amount_out,
                    path,
                    recipient,
                    deadline,
                );
                Ok(call.calldata().ok_or_else(|| VenueError::EncodingFailed {
                    venue: venue.key.clone(),
                    message: "router call produced no calldata".into(),
                })?)
            }
            VenueAdapter::UniswapV3 { venue, .. } => {
                let params = ExactInputSingleCall {
                    token_in,
                    token_out,
                    fee: venue.fee_bps * 100,
                    recipient,
                    deadline,
                    amount_in,
                    amount_out_minimum: min_amount_out,
                    sqrt_price_limit_x96: U256::zero(),
                };
                Ok(Bytes::from(params.encode()))
            }
        }
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_types::VenueKind;

    fn client() -> Arc<HttpProvider> {
        Arc::new(Provider::<Http>::try_from("http://localhost:8545").unwrap())
    }

    fn v2_venue() -> Venue {
        Venue {
            key: "quickswap".into(),
            chain_id: 137,
            kind: VenueKind::UniswapV2,
            router: Address::from_low_u64_be(1),
            factory: Address::from_low_u64_be(2),
            fee_bps: 30,
        }
    }

    fn v3_venue() -> Venue {
        Venue {
            key: "uniswap-v3".into(),
            chain_id: 1,
            kind: VenueKind::UniswapV3,
            router: Address::from_low_u64_be(3),
            factory: Address::from_low_u64_be(4),
            fee_bps: 5,
        }
    }

    #[test]
    fn v2_build_swap_call_targets_the_router_address() {
        let venue = v2_venue();
        let router_address = venue.router;
        let adapter = VenueAdapter::new(venue, client(), None);
        assert_eq!(adapter.router_address(), router_address);
        assert_eq!(adapter.fee_bps(), 30);

        let calldata = adapter
            .build_swap_call(
                Address::from_low_u64_be(10),
                Address::from_low_u64_be(11),
                U256::from(1_000u64),
                U256::from(990u64),
                Address::from_low_u64_be(99),
                120,
            )
            .unwrap();
        assert!(!calldata.0.is_empty());
    }

    #[test]
    fn v3_build_swap_call_encodes_exact_input_single() {
        let adapter = VenueAdapter::new(v3_venue(), client(), None);
        assert_eq!(adapter.fee_bps(), 5);

        let calldata = adapter
            .build_swap_call(
                Address::from_low_u64_be(10),
                Address::from_low_u64_be(11),
                U256::from(1_000u64),
                U256::from(990u64),
                Address::from_low_u64_be(99),
                120,
            )
            .unwrap();
        assert!(!calldata.0.is_empty());
    }

    #[test]
    fn v2_and_v3_calldata_differ_for_equivalent_inputs() {
        let v2 = VenueAdapter::new(v2_venue(), client(), None);
        let v3 = VenueAdapter::new(v3_venue(), client(), None);
        let args = (
            Address::from_low_u64_be(10),
            Address::from_low_u64_be(11),
            U256::from(1_000u64),
            U256::from(990u64),
            Address::from_low_u64_be(99),
            120u64,
        );
        let v2_call = v2.build_swap_call(args.0, args.1, args.2, args.3, args.4, args.5).unwrap();
        let v3_call = v3.build_swap_call(args.0, args.1, args.2, args.3, args.4, args.5).unwrap();
        assert_ne!(v2_call, v3_call);
    }
}
