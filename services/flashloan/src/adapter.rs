//! The Flash-Loan Provider Adapter (C4): a tagged union over the supported
//! lending protocols, each producing borrow sizing and the calldata for the
//! loan-initiating transaction.

use crate::abi::{IAavePool, IBalancerVault, IERC20};
use crate::error::FlashLoanError;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, U256};
use flasharb_types::{FlashLoanProvider, ProviderKind};
use std::sync::Arc;

pub type HttpProvider = Provider<Http>;

/// Conservative fraction of on-hand liquidity exposed as `maxBorrow` (§4.4).
const MAX_BORROW_FRACTION_NUM: u64 = 80;
const MAX_BORROW_FRACTION_DEN: u64 = 100;

/// The destination and calldata for the transaction that initiates the
/// flash loan. The Orchestrator (C8) wraps this with gas parameters, signs,
/// and submits it.
pub struct FlashLoanTx {
    pub to: Address,
    pub calldata: Bytes,
}

pub enum FlashLoanAdapter {
    AaveV3 {
        provider: FlashLoanProvider,
        pool: IAavePool<HttpProvider>,
        client: Arc<HttpProvider>,
    },
    Balancer {
        provider: FlashLoanProvider,
        vault: IBalancerVault<HttpProvider>,
        client: Arc<HttpProvider>,
    },
}

impl FlashLoanAdapter {
    pub fn new(provider: FlashLoanProvider, client: Arc<HttpProvider>) -> Self {
        match provider.kind {
            ProviderKind::AaveV3 => {
                let pool = IAavePool::new(provider.pool_address, client.clone());
                FlashLoanAdapter::AaveV3 {
                    provider,
                    pool,
                    client,
                }
            }
            ProviderKind::Balancer => {
                let vault = IBalancerVault::new(provider.pool_address, client.clone());
                FlashLoanAdapter::Balancer {
                    provider,
                    vault,
                    client,
                }
            }
        }
    }

    pub fn provider(&self) -> &FlashLoanProvider {
        match self {
            FlashLoanAdapter::AaveV3 { provider, .. } => provider,
            FlashLoanAdapter::Balancer { provider, .. } => provider,
        }
    }

    pub fn fee_basis_points(&self) -> u32 {
        self.provider().fee_bps
    }

    fn client(&self) -> &Arc<HttpProvider> {
        match self {
            FlashLoanAdapter::AaveV3 { client, .. } => client,
            FlashLoanAdapter::Balancer { client, .. } => client,
        }
    }

    fn require_supported(&self, token: Address) -> Result<(), FlashLoanError> {
        if self.provider().supported_tokens.contains(&token) {
            Ok(())
        } else {
            Err(FlashLoanError::UnsupportedToken {
                provider: self.provider().key.clone(),
                token,
            })
        }
    }

    /// `maxBorrow(token) -> amount`: 80% of the provider's on-hand balance
    /// of `token` (§4.4).
    pub async fn max_borrow(&self, token: Address) -> Result<U256, FlashLoanError> {
        self.require_supported(token)?;
        let erc20 = IERC20::new(token, self.client().clone());
        let pool_address = self.provider().pool_address;
        let balance = erc20
            .balance_of(pool_address)
            .call()
            .await
            .map_err(|source| FlashLoanError::ReadFailed {
                provider: self.provider().key.clone(),
                source,
            })?;
        Ok(balance * U256::from(MAX_BORROW_FRACTION_NUM) / U256::from(MAX_BORROW_FRACTION_DEN))
    }

    /// `buildBorrowTx(receiver, token, amount, innerCallbackPayload) ->
    /// txRequest` (§4.4). The callback contract at `receiver` is expected
    /// to decode `inner_callback_payload`, execute the arbitrage swaps, and
    /// leave `amount + fee` available for the provider to pull back before
    /// the transaction ends.
    pub fn build_borrow_tx(
        &self,
        receiver: Address,
        token: Address,
        amount: U256,
        inner_callback_payload: Bytes,
    ) -> Result<FlashLoanTx, FlashLoanError> {
        self.require_supported(token)?;
        match self {
            FlashLoanAdapter::AaveV3 { pool, .. } => {
                let call = pool.flash_loan(
                    receiver,
                    vec![token],
                    vec![amount],
                    vec![U256::zero()],
                    receiver,
                    inner_callback_payload,
                    0,
                );
                let calldata = call.calldata().ok_or_else(|| FlashLoanError::UnsupportedToken {
                    provider: self.provider().key.clone(),
                    token,
                })?;
                Ok(FlashLoanTx {
                    to: pool.address(),
                    calldata,
                })
            }
            FlashLoanAdapter::Balancer { vault, .. } => {
                let call = vault.flash_loan(
                    receiver,
                    vec![token],
                    vec![amount],
                    inner_callback_payload,
                );
                let calldata = call.calldata().ok_or_else(|| FlashLoanError::UnsupportedToken {
                    provider: self.provider().key.clone(),
                    token,
                })?;
                Ok(FlashLoanTx {
                    to: vault.address(),
                    calldata,
                })
            }
        }
    }

    /// `isHealthy() -> bool`: the pool contract is readable and the
    /// operator wallet holds at least `min_native_reserve` wei (§4.4).
    pub async fn is_healthy(&self, operator: Address, min_native_reserve: U256) -> bool {
        let code_present = match self.client().get_code(self.pool_or_vault_address(), None).await {
            Ok(code) => !code.0.is_empty(),
            Err(err) => {
                tracing::warn!(provider = %self.provider().key, error = %err, "contract liveness probe failed");
                false
            }
        };
        if !code_present {
            return false;
        }
        match self.client().get_balance(operator, None).await {
            Ok(balance) => balance >= min_native_reserve,
            Err(err) => {
                tracing::warn!(provider = %self.provider().key, error = %err, "gas reserve probe failed");
                false
            }
        }
    }

    fn pool_or_vault_address(&self) -> Address {
        match self {
            FlashLoanAdapter::AaveV3 { pool, .. } => pool.address(),
            FlashLoanAdapter::Balancer { vault, .. } => vault.address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Arc<HttpProvider> {
        Arc::new(Provider::<Http>::try_from("http://localhost:8545").unwrap())
    }

    fn provider_descriptor(kind: ProviderKind, supported_tokens: Vec<Address>) -> FlashLoanProvider {
        FlashLoanProvider {
            key: "aave".into(),
            chain_id: 137,
            kind,
            pool_address: Address::from_low_u64_be(7),
            fee_bps: 9,
            supported_tokens,
            gas_units_hint: 300_000,
        }
    }

    #[test]
    fn fee_basis_points_reflects_the_descriptor() {
        let token = Address::from_low_u64_be(1);
        let adapter = FlashLoanAdapter::new(provider_descriptor(ProviderKind::AaveV3, vec![token]), client());
        assert_eq!(adapter.fee_basis_points(), 9);
    }

    #[test]
    fn build_borrow_tx_rejects_unsupported_token() {
        let supported = Address::from_low_u64_be(1);
        let unsupported = Address::from_low_u64_be(2);
        let adapter = FlashLoanAdapter::new(provider_descriptor(ProviderKind::AaveV3, vec![supported]), client());
        let result = adapter.build_borrow_tx(
            Address::from_low_u64_be(99),
            unsupported,
            U256::from(1_000u64),
            Bytes::default(),
        );
        assert!(matches!(result, Err(FlashLoanError::UnsupportedToken { .. })));
    }

    #[test]
    fn build_borrow_tx_targets_the_pool_for_aave() {
        let token = Address::from_low_u64_be(1);
        let adapter = FlashLoanAdapter::new(provider_descriptor(ProviderKind::AaveV3, vec![token]), client());
        let tx = adapter
            .build_borrow_tx(Address::from_low_u64_be(99), token, U256::from(1_000u64), Bytes::default())
            .unwrap();
        assert_eq!(tx.to, Address::from_low_u64_be(7));
        assert!(!tx.calldata.0.is_empty());
    }

    #[test]
    fn build_borrow_tx_targets_the_vault_for_balancer() {
        let token = Address::from_low_u64_be(1);
        let adapter = FlashLoanAdapter::new(provider_descriptor(ProviderKind::Balancer, vec![token]), client());
        let tx = adapter
            .build_borrow_tx(Address::from_low_u64_be(99), token, U256::from(1_000u64), Bytes::default())
            .unwrap();
        assert_eq!(tx.to, Address::from_low_u64_be(7));
    }
}
