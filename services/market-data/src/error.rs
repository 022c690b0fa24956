//! Error classification for the Market Data Coordinator (C1).
//!
//! `CoordinatorError::kind()` maps onto SPEC_FULL.md §7's error-kind table:
//! transient errors are retried within C1, breaker-open and exhausted errors
//! surface to the caller (Scanner skips a tick, Oracle marks a pair stale).

use thiserror::Error;

/// The four error kinds `route()` can report, per §4.1 "Failure semantics".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    RateLimited,
    ConfigError,
    UnsupportedCapability,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no registered provider advertises capability {capability:?}")]
    UnsupportedCapability { capability: flasharb_types::Capability },

    #[error("no healthy provider available for capability {capability:?}")]
    NoEligibleProvider { capability: flasharb_types::Capability },

    #[error("circuit breaker open for provider '{provider}'")]
    BreakerOpen { provider: String },

    #[error("request to provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("provider '{provider}' rate-limited the request")]
    RateLimited { provider: String },

    #[error("provider '{provider}' returned an error: {message}")]
    ProviderError { provider: String, message: String },

    #[error("request body could not be parsed: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("both primary and failover attempts exhausted for capability {capability:?}")]
    Exhausted { capability: flasharb_types::Capability },
}

impl CoordinatorError {
    /// Whether this failure counts toward the subject's circuit breaker
    /// (§4.1 point 5: "Timeouts count as failures for breaker purposes").
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self,
            CoordinatorError::Timeout { .. }
                | CoordinatorError::ProviderError { .. }
                | CoordinatorError::Transport(_)
                | CoordinatorError::RateLimited { .. }
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::RateLimited { .. } => ErrorKind::RateLimited,
            CoordinatorError::UnsupportedCapability { .. } => ErrorKind::UnsupportedCapability,
            CoordinatorError::Deserialize(_) => ErrorKind::ConfigError,
            _ => ErrorKind::Transient,
        }
    }
}
