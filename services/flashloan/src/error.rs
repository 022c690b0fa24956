use ethers::types::Address;
use thiserror::Error;

/// §4.4: "any builder call fails with UnsupportedToken or ProviderUnhealthy;
/// these propagate to C8 without retry."
#[derive(Debug, Error)]
pub enum FlashLoanError {
    #[error("provider '{provider}' does not support token {token:?}")]
    UnsupportedToken { provider: String, token: Address },

    #[error("provider '{provider}' is unhealthy")]
    ProviderUnhealthy { provider: String },

    #[error("on-chain read failed for provider '{provider}': {source}")]
    ReadFailed {
        provider: String,
        #[source]
        source: ethers::contract::ContractError<ethers_providers::Provider<ethers_providers::Http>>,
    },

    #[error("native gas balance query failed for provider '{provider}': {source}")]
    BalanceQueryFailed {
        provider: String,
        #[source]
        source: ethers_providers::ProviderError,
    },
}
