//! CLI entry point (SPEC_FULL.md §12): a thin shell around the process-wide
//! singletons the rest of this crate defines. Parses arguments, loads and
//! validates configuration, installs logging, wires every component
//! together in dependency order, spawns the per-chain tasks, and waits for
//! a shutdown signal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ethers::signers::LocalWallet;
use ethers_core::types::Address;
use flasharb_config::{EngineConfig, PairConfig};
use flasharb_engine::{
    EngineRegistry, ExecutionQueue, Orchestrator, PriceFetcher, PriceOracle, RawPriceQuote,
    RiskSupervisor, RiskSupervisorConfig, Scanner, TelemetrySink,
};
use flasharb_estimator::EstimatorConfig;
use flasharb_market_data::{Coordinator, CoordinatorConfig as MdCoordinatorConfig, ProviderRegistry};
use flasharb_types::{CircuitBreakerConfig, IdGenerator};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flasharb-engine", about = "Automated DEX flash-loan arbitrage engine")]
struct Cli {
    /// Path to the configuration document.
    #[arg(long)]
    config: PathBuf,

    /// Force simulation mode regardless of the document's `risk.simulation_mode`.
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a snapshot of the supervisor's counters and exit.
    Status,
}

fn install_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();
}

/// Polls a configured data provider over HTTP for one token's price
/// snapshot (§4.1/§4.2: "dataProviders are polled over HTTP"). The exact
/// response shape is provider-specific in production; this client expects
/// the minimal `{unit_price, volume_24h, change_24h_pct}` JSON contract any
/// adapter in front of a real feed is expected to normalize to.
fn http_price_fetcher() -> PriceFetcher {
    #[derive(serde::Deserialize)]
    struct PriceResponse {
        unit_price: rust_decimal::Decimal,
        volume_24h: rust_decimal::Decimal,
        change_24h_pct: rust_decimal::Decimal,
    }

    let client = reqwest::Client::new();
    Arc::new(move |provider, token| {
        let client = client.clone();
        Box::pin(async move {
            let url = format!("{}/price/{:?}", provider.config.base_url, token);
            let response = client
                .get(&url)
                .timeout(Duration::from_millis(provider.config.timeout_ms))
                .send()
                .await?;
            let parsed: PriceResponse = response.json().await?;
            Ok(RawPriceQuote {
                unit_price: parsed.unit_price,
                volume_24h: parsed.volume_24h,
                change_24h_pct: parsed.change_24h_pct,
            })
        })
    })
}

/// Every `(chain_id, token_address)` pair any configured pair touches, so
/// the refresh loop only polls tokens the Scanner actually needs priced.
fn watched_tokens(registry: &EngineRegistry) -> Vec<(u64, Address)> {
    registry
        .chains
        .values()
        .flat_map(|runtime| {
            let chain_id = runtime.chain.chain_id;
            runtime.tokens.values().map(move |t| (chain_id, t.address)).collect::<Vec<_>>()
        })
        .collect()
}

fn pairs_by_chain(config: &EngineConfig) -> HashMap<u64, Vec<PairConfig>> {
    let mut map: HashMap<u64, Vec<PairConfig>> = HashMap::new();
    for pair in &config.pairs {
        if let Some(chain_cfg) = config.chains.iter().find(|c| c.key == pair.chain_key) {
            map.entry(chain_cfg.chain_id).or_default().push(pair.clone());
        }
    }
    map
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match EngineConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err:#}");
            std::process::exit(1);
        }
    };
    if cli.simulate {
        config.risk.simulation_mode = true;
    }

    install_logging();
    tracing::info!(chains = config.chains.len(), "configuration loaded");

    let registry = match EngineRegistry::build(&config) {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            tracing::error!(error = %err, "failed to build chain registry");
            std::process::exit(1);
        }
    };

    let risk_config = RiskSupervisorConfig::from(&config.risk);
    let chain_budgets: Vec<(u64, rust_decimal::Decimal)> = registry
        .chains
        .values()
        .map(|runtime| (runtime.chain.chain_id, runtime.daily_gas_cap_native))
        .collect();
    let risk = Arc::new(RiskSupervisor::new(risk_config, chain_budgets));
    risk.set_kill_switch(config.risk.kill_switch);

    let telemetry = TelemetrySink::new();
    let id_gen = Arc::new(IdGenerator::new());

    let provider_registry = ProviderRegistry::from_configs(
        &config.data_providers,
        CircuitBreakerConfig {
            failure_threshold: config.coordinator.circuit_breaker_threshold,
            cooldown: Duration::from_millis(config.coordinator.circuit_breaker_cooldown_ms),
            ..CircuitBreakerConfig::default()
        },
    );
    let coordinator = Arc::new(Coordinator::new(
        provider_registry.clone(),
        config.coordinator.load_balancing,
        MdCoordinatorConfig::from(&config.coordinator),
    ));
    let oracle = Arc::new(PriceOracle::new(
        coordinator,
        http_price_fetcher(),
        config.coordinator.price_ttl_ms,
        config.coordinator.oracle_sanity_bound_pct,
    ));

    if let Some(Command::Status) = cli.command {
        for chain_id in registry.chains.keys() {
            println!(
                "chain {chain_id}: kill_switch={} budget_headroom={:?}",
                risk.kill_switch_engaged(),
                risk.budget_headroom(*chain_id)
            );
        }
        return;
    }

    let estimator_config = EstimatorConfig {
        min_margin_bps: config.risk.min_margin_bps,
        max_slippage_bps: config.risk.max_slippage_bps,
        reserve_fraction: config.risk.reserve_fraction,
        gas_price_ceiling: rust_decimal::Decimal::from(config.scanner.gas_price_ceiling_gwei),
    };

    let operator_key = std::env::var("FLASHARB_OPERATOR_KEY").unwrap_or_default();
    let wallet = match LocalWallet::from_str(&operator_key) {
        Ok(wallet) => wallet,
        Err(err) => {
            tracing::error!(error = %err, "FLASHARB_OPERATOR_KEY is missing or invalid");
            std::process::exit(1);
        }
    };

    let mut tasks = Vec::new();

    tasks.push(flasharb_market_data::spawn_health_prober(
        provider_registry,
        Duration::from_millis(config.coordinator.health_probe_interval_ms),
        |_record| async move { true },
    ));

    tasks.push({
        let oracle = oracle.clone();
        let watched = watched_tokens(&registry);
        let refresh_period = Duration::from_millis(config.coordinator.oracle_refresh_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh_period);
            loop {
                interval.tick().await;
                let now_ms = chrono::Utc::now().timestamp_millis();
                for (chain_id, token) in &watched {
                    oracle.refresh(*chain_id, *token, now_ms).await;
                }
            }
        })
    });

    let pairs = pairs_by_chain(&config);
    for (chain_id, runtime) in registry.chains.iter() {
        let queue = Arc::new(ExecutionQueue::new(config.scanner.queue_capacity));

        let scanner = Arc::new(Scanner::new(
            *chain_id,
            runtime.clone(),
            oracle.clone(),
            queue.clone(),
            telemetry.clone(),
            id_gen.clone(),
            pairs.get(chain_id).cloned().unwrap_or_default(),
            config.scanner.clone(),
            estimator_config.clone(),
        ));
        tasks.push(tokio::spawn(scanner.run()));

        let orchestrator = Arc::new(Orchestrator::new(
            *chain_id,
            runtime.clone(),
            oracle.clone(),
            queue,
            risk.clone(),
            telemetry.clone(),
            id_gen.clone(),
            wallet.clone(),
            estimator_config.clone(),
            config.orchestrator.clone(),
            config.risk.simulation_mode,
        ));
        tasks.push(tokio::spawn(orchestrator.run()));
    }

    let shutdown_kill_switch = risk.kill_switch_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::warn!("shutdown signal received, engaging kill-switch");
        shutdown_kill_switch.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    for task in tasks {
        let _ = task.await;
    }
}
