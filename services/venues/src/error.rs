use thiserror::Error;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("on-chain quote call failed for venue '{venue}': {source}")]
    QuoteFailed {
        venue: String,
        #[source]
        source: ethers::contract::ContractError<ethers_providers::Provider<ethers_providers::Http>>,
    },

    #[error("router returned an empty amounts path for venue '{venue}'")]
    EmptyAmountsPath { venue: String },

    #[error("unsupported token pair for venue '{venue}'")]
    UnsupportedPair { venue: String },

    #[error("calldata encoding failed for venue '{venue}': {message}")]
    EncodingFailed { venue: String, message: String },
}
