//! # Flasharb Configuration — the single document loaded at startup
//!
//! ## Purpose
//!
//! Centralizes every recognized configuration key (SPEC_FULL.md §13) into
//! one `EngineConfig` aggregate: the static registries (chains, tokens,
//! venues, flash-loan providers, data providers, watched pairs) and the
//! per-component tuning knobs (risk, scanner, coordinator, orchestrator).
//! Supports TOML file loading layered with a `FLASHARB__`-prefixed
//! environment override, mirroring this stack's existing configuration
//! crate.
//!
//! ## Integration Points
//!
//! - **Input Sources**: a TOML document path from the CLI, environment
//!   variables for production overrides and secret RPC URLs.
//! - **Output Destinations**: every other crate in the workspace borrows an
//!   `&EngineConfig` (or one of its sub-structs) at construction time.
//! - **Validation**: `EngineConfig::validate()` rejects dangling chain/token
//!   references and out-of-range numeric bounds before any component starts.

mod model;

pub use model::*;

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use std::path::Path;
use tracing::{debug, info};

impl EngineConfig {
    /// Load the configuration document from `path`, layering a
    /// `FLASHARB__SECTION__KEY`-style environment override on top (double
    /// underscore separator, since section/key names use single
    /// underscores already).
    pub fn load(path: &Path) -> Result<Self> {
        info!(?path, "loading engine configuration");
        let builder = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix("FLASHARB")
                    .separator("__")
                    .try_parsing(true),
            );

        let raw = builder.build().context("failed to build configuration")?;
        let mut config: EngineConfig = raw
            .try_deserialize()
            .context("failed to deserialize configuration document")?;

        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}`-style references in RPC and data-provider URLs, the
    /// same mechanism this stack's service configuration uses for socket
    /// paths.
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for chain in &mut self.chains {
            chain.rpc_url = shellexpand::env(&chain.rpc_url)
                .context("failed to expand chain rpc_url")?
                .to_string();
        }
        for provider in &mut self.data_providers {
            provider.base_url = shellexpand::env(&provider.base_url)
                .context("failed to expand data provider base_url")?
                .to_string();
        }
        Ok(())
    }

    /// Reject the document outright (ConfigInvalid, fatal per SPEC_FULL.md
    /// §7) rather than letting a dangling reference surface later as a
    /// confusing runtime panic.
    pub fn validate(&self) -> Result<()> {
        let chain_keys: std::collections::HashSet<_> =
            self.chains.iter().map(|c| c.key.as_str()).collect();

        for venue in &self.venues {
            if !chain_keys.contains(venue.chain_key.as_str()) {
                bail!(
                    "venue '{}' references undeclared chain '{}'",
                    venue.key,
                    venue.chain_key
                );
            }
        }
        for provider in &self.providers {
            if !chain_keys.contains(provider.chain_key.as_str()) {
                bail!(
                    "provider '{}' references undeclared chain '{}'",
                    provider.key,
                    provider.chain_key
                );
            }
        }
        for token in &self.tokens {
            if !chain_keys.contains(token.chain_key.as_str()) {
                bail!(
                    "token '{}' references undeclared chain '{}'",
                    token.symbol,
                    token.chain_key
                );
            }
        }
        for pair in &self.pairs {
            if !chain_keys.contains(pair.chain_key.as_str()) {
                bail!("pair references undeclared chain '{}'", pair.chain_key);
            }
            let has_token = |symbol: &str| {
                self.tokens
                    .iter()
                    .any(|t| t.chain_key == pair.chain_key && t.symbol == symbol)
            };
            if !has_token(&pair.token_a_symbol) || !has_token(&pair.token_b_symbol) {
                bail!(
                    "pair {}/{} on chain '{}' references an undeclared token",
                    pair.token_a_symbol,
                    pair.token_b_symbol,
                    pair.chain_key
                );
            }
        }

        if self.risk.min_margin_bps == 0 {
            bail!("risk.min_margin_bps must be positive");
        }
        if self.risk.max_slippage_bps > 10_000 {
            bail!("risk.max_slippage_bps must be <= 10000");
        }
        if self.scanner.queue_capacity == 0 {
            bail!("scanner.queue_capacity must be positive");
        }
        if self.scanner.scan_period_ms == 0 {
            bail!("scanner.scan_period_ms must be positive");
        }
        if self.scanner.top_k == 0 {
            bail!("scanner.top_k must be positive");
        }
        if self.coordinator.circuit_breaker_threshold == 0 {
            bail!("coordinator.circuit_breaker_threshold must be positive");
        }
        if self.orchestrator.pending_deadline_ms == 0 {
            bail!("orchestrator.pending_deadline_ms must be positive");
        }

        debug!("configuration document validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::tempdir;

    fn sample_toml() -> &'static str {
        r#"
[[chains]]
key = "polygon"
chain_id = 137
name = "Polygon"
rpc_url = "https://polygon-rpc.com"
block_time_ms = 2000
native_symbol = "MATIC"
native_decimals = 18
venue_keys = ["quickswap"]
provider_keys = ["aave"]
token_keys = ["usdc", "weth"]
daily_gas_budget_native = "50"

[[tokens]]
chain_key = "polygon"
symbol = "usdc"
address = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174"
decimals = 6

[[tokens]]
chain_key = "polygon"
symbol = "weth"
address = "0x7ceb23fd6bc0add59e62ac25578270cff1b9f619"
decimals = 18

[[venues]]
key = "quickswap"
chain_key = "polygon"
kind = "uniswap_v2"
router = "0xa5e0829caced8ffdd4de3c43696c57f7d7a678ff"
factory = "0x5757371414417b8c6caad45baef941abc7d3ab32"
fee_bps = 25

[[providers]]
key = "aave"
chain_key = "polygon"
kind = "aave_v3"
pool_address = "0x794a61358d6845594f94dc1db02a252b5b4814ad"
fee_bps = 5
supported_token_symbols = ["usdc", "weth"]
gas_units_hint = 300000

[[pairs]]
chain_key = "polygon"
token_a_symbol = "usdc"
token_b_symbol = "weth"
min_volume_usd_floor = "10000"
min_trade_size_usd = "100"

[risk]
min_margin_bps = 25

[scanner]
queue_capacity = 64

[coordinator]

[orchestrator]
"#
    }

    #[test]
    fn loads_and_validates_sample_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, sample_toml()).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.risk.min_margin_bps, 25);
        assert_eq!(config.pairs[0].min_volume_usd_floor, dec!(10000));
    }

    #[test]
    fn rejects_dangling_venue_chain_reference() {
        let mut config = EngineConfig::default();
        config.venues.push(VenueConfig {
            key: "orphan".into(),
            chain_key: "nowhere".into(),
            kind: flasharb_types::VenueKind::UniswapV2,
            router: "0x0000000000000000000000000000000000000000".into(),
            factory: "0x0000000000000000000000000000000000000000".into(),
            fee_bps: 30,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }
}
