//! Per-chain adapter tables (SPEC_FULL.md §9: "prefer pre-allocated adapter
//! tables indexed by (chain, key) over ad-hoc maps"). Built once at startup
//! from the configuration document and held for process lifetime by every
//! task that needs to reach a chain's venues or flash-loan providers.

use ethers::providers::{Http, Provider};
use ethers_core::types::Address;
use flasharb_config::{ChainConfig, ProviderConfig, TokenConfig, VenueConfig};
use flasharb_flashloan::FlashLoanAdapter;
use flasharb_types::{Chain, CircuitBreaker, CircuitBreakerConfig, FlashLoanProvider, Token, Venue};
use flasharb_venues::VenueAdapter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct ChainRuntime {
    pub chain: Chain,
    pub client: Arc<Provider<Http>>,
    pub tokens: HashMap<String, Token>,
    pub venues: HashMap<String, VenueAdapter>,
    pub providers: HashMap<String, FlashLoanAdapter>,
    /// Per-provider liveness breaker, separate from the Risk Supervisor's
    /// chain-level breaker (§4.9): a provider can be unhealthy on a chain
    /// whose own revert counters are otherwise fine.
    pub provider_breakers: HashMap<String, Mutex<CircuitBreaker>>,
    pub daily_gas_cap_native: rust_decimal::Decimal,
    /// Resolved by matching `native_symbol` against the chain's token table;
    /// `None` when the chain has no token entry named after its native
    /// asset (e.g. a wrapped-native symbol mismatch), in which case price
    /// lookups for the native asset simply miss.
    pub native_token: Option<Address>,
}

impl ChainRuntime {
    pub fn build(
        chain_cfg: &ChainConfig,
        token_cfgs: &[TokenConfig],
        venue_cfgs: &[VenueConfig],
        provider_cfgs: &[ProviderConfig],
        daily_gas_cap_override: Option<rust_decimal::Decimal>,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(Provider::<Http>::try_from(chain_cfg.rpc_url.as_str())?);

        let chain = Chain {
            chain_id: chain_cfg.chain_id,
            name: chain_cfg.name.clone(),
            rpc_url: chain_cfg.rpc_url.clone(),
            native_symbol: chain_cfg.native_symbol.clone(),
            native_decimals: chain_cfg.native_decimals,
            block_time: Duration::from_millis(chain_cfg.block_time_ms),
            venue_keys: chain_cfg.venue_keys.clone(),
            provider_keys: chain_cfg.provider_keys.clone(),
            token_keys: chain_cfg.token_keys.clone(),
            callback_receiver: Address::from_str(&chain_cfg.callback_receiver)?,
        };

        let mut tokens = HashMap::new();
        for token_cfg in token_cfgs.iter().filter(|t| t.chain_key == chain_cfg.key) {
            let token = Token {
                chain_id: chain_cfg.chain_id,
                address: Address::from_str(&token_cfg.address)?,
                decimals: token_cfg.decimals,
            };
            tokens.insert(token_cfg.symbol.clone(), token);
        }

        let mut venues = HashMap::new();
        for venue_cfg in venue_cfgs.iter().filter(|v| v.chain_key == chain_cfg.key) {
            let venue = Venue {
                key: venue_cfg.key.clone(),
                chain_id: chain_cfg.chain_id,
                kind: venue_cfg.kind,
                router: Address::from_str(&venue_cfg.router)?,
                factory: Address::from_str(&venue_cfg.factory)?,
                fee_bps: venue_cfg.fee_bps,
            };
            venues.insert(venue_cfg.key.clone(), VenueAdapter::new(venue, client.clone(), None));
        }

        let mut providers = HashMap::new();
        let mut provider_breakers = HashMap::new();
        for provider_cfg in provider_cfgs.iter().filter(|p| p.chain_key == chain_cfg.key) {
            let supported_tokens = provider_cfg
                .supported_token_symbols
                .iter()
                .filter_map(|symbol| tokens.get(symbol).map(|t| t.address))
                .collect();
            let provider = FlashLoanProvider {
                key: provider_cfg.key.clone(),
                chain_id: chain_cfg.chain_id,
                kind: provider_cfg.kind,
                pool_address: Address::from_str(&provider_cfg.pool_address)?,
                fee_bps: provider_cfg.fee_bps,
                supported_tokens,
                gas_units_hint: provider_cfg.gas_units_hint,
            };
            providers.insert(provider_cfg.key.clone(), FlashLoanAdapter::new(provider, client.clone()));
            provider_breakers.insert(
                provider_cfg.key.clone(),
                Mutex::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            );
        }

        let native_token = tokens.get(&chain_cfg.native_symbol).map(|t| t.address);

        Ok(Self {
            chain,
            client,
            tokens,
            venues,
            providers,
            provider_breakers,
            daily_gas_cap_native: daily_gas_cap_override.unwrap_or(chain_cfg.daily_gas_budget_native),
            native_token,
        })
    }

    pub fn token_address(&self, symbol: &str) -> Option<Address> {
        self.tokens.get(symbol).map(|t| t.address)
    }

    /// Reverse lookup used by the Orchestrator (C8), which only has the
    /// token address embedded in an `Opportunity`, not its config symbol.
    pub fn token_by_address(&self, address: Address) -> Option<&Token> {
        self.tokens.values().find(|t| t.address == address)
    }
}

/// The full set of chain runtimes, keyed by `chain_id`, built once at
/// startup (SPEC_FULL.md §9 "Global state"). Each runtime is held behind an
/// `Arc` so the Scanner and Orchestrator tasks for the same chain share one
/// instance rather than each needing their own copy of its adapter tables.
pub struct EngineRegistry {
    pub chains: HashMap<u64, Arc<ChainRuntime>>,
}

impl EngineRegistry {
    pub fn build(config: &flasharb_config::EngineConfig) -> anyhow::Result<Self> {
        let mut chains = HashMap::new();
        for chain_cfg in &config.chains {
            let override_cap = config
                .risk
                .daily_gas_budget_native_overrides
                .get(&chain_cfg.key)
                .copied();
            let runtime = ChainRuntime::build(
                chain_cfg,
                &config.tokens,
                &config.venues,
                &config.providers,
                override_cap,
            )?;
            chains.insert(chain_cfg.chain_id, Arc::new(runtime));
        }
        Ok(Self { chains })
    }
}
