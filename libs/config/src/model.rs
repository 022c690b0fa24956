use flasharb_types::{Capability, LoadBalancingPolicy, PriorityTier, ProviderKind, VenueKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The single configuration document, aggregating every recognized key
/// from SPEC_FULL.md §6.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default, rename = "dataProviders")]
    pub data_providers: Vec<DataProviderConfig>,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub key: String,
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub block_time_ms: u64,
    pub native_symbol: String,
    pub native_decimals: u8,
    #[serde(default)]
    pub venue_keys: Vec<String>,
    #[serde(default)]
    pub provider_keys: Vec<String>,
    #[serde(default)]
    pub token_keys: Vec<String>,
    pub daily_gas_budget_native: Decimal,
    /// Address of the external callback contract (§6 "on-chain contract
    /// interface") the Orchestrator targets as `receiver` when building the
    /// borrow transaction. One per chain, since the callback contract is
    /// deployed separately on each chain the engine trades on.
    pub callback_receiver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub chain_key: String,
    pub symbol: String,
    /// Checksummed hex address; parsed lazily (see
    /// `flasharb_types::Token`'s constructor) to keep this crate free of an
    /// `ethers-core` dependency, matching this stack's existing
    /// `ExecutorConfig::flash_loan_contract` convention of storing
    /// addresses as strings in config and parsing them at point of use.
    pub address: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub key: String,
    pub chain_key: String,
    pub kind: VenueKind,
    pub router: String,
    pub factory: String,
    pub fee_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub key: String,
    pub chain_key: String,
    pub kind: ProviderKind,
    pub pool_address: String,
    pub fee_bps: u32,
    #[serde(default)]
    pub supported_token_symbols: Vec<String>,
    pub gas_units_hint: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProviderConfig {
    pub key: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default = "default_priority")]
    pub priority: PriorityTier,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
}

fn default_priority() -> PriorityTier {
    PriorityTier::Medium
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_max_concurrency() -> u32 {
    8
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    pub chain_key: String,
    pub token_a_symbol: String,
    pub token_b_symbol: String,
    pub min_volume_usd_floor: Decimal,
    #[serde(default)]
    pub preferred_provider_key: Option<String>,
    #[serde(default = "default_min_trade_size_usd")]
    pub min_trade_size_usd: Decimal,
}

fn default_min_trade_size_usd() -> Decimal {
    dec!(100)
}

/// Admission and sizing thresholds the Risk Supervisor (C9) and Profit
/// Estimator (C5) enforce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub min_margin_bps: u32,
    pub max_slippage_bps: u32,
    pub max_trade_size_usd: Decimal,
    pub reserve_fraction: Decimal,
    #[serde(default)]
    pub daily_gas_budget_native_overrides: HashMap<String, Decimal>,
    pub revert_threshold: u32,
    pub revert_window_secs: u64,
    pub admission_cooldown_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub simulation_mode: bool,
    pub kill_switch: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_margin_bps: 25,
            max_slippage_bps: 10,
            max_trade_size_usd: dec!(50_000),
            reserve_fraction: dec!(0.0005),
            daily_gas_budget_native_overrides: HashMap::new(),
            revert_threshold: 3,
            revert_window_secs: 3_600,
            admission_cooldown_ms: 500,
            breaker_cooldown_secs: 300,
            simulation_mode: false,
            kill_switch: false,
        }
    }
}

/// Scanner (C6) tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub scan_period_ms: u64,
    pub queue_capacity: usize,
    pub trade_size_fraction_of_volume: Decimal,
    pub trade_size_hard_cap_usd: Decimal,
    pub min_diff_bps_floor: Decimal,
    pub top_k: usize,
    pub gas_price_ceiling_gwei: u64,
    pub confidence_floor: Decimal,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_period_ms: 5_000,
            queue_capacity: 64,
            trade_size_fraction_of_volume: dec!(0.01),
            trade_size_hard_cap_usd: dec!(50_000),
            min_diff_bps_floor: dec!(10),
            top_k: 3,
            gas_price_ceiling_gwei: 500,
            confidence_floor: dec!(0.5),
        }
    }
}

/// Market Data Coordinator (C1) and Price Oracle (C2) tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub load_balancing: LoadBalancingPolicy,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown_ms: u64,
    pub health_probe_interval_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub price_ttl_ms: i64,
    pub oracle_refresh_ms: u64,
    pub oracle_sanity_bound_pct: Decimal,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            load_balancing: LoadBalancingPolicy::RoundRobin,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_ms: 60_000,
            health_probe_interval_ms: 30_000,
            retry_attempts: 3,
            retry_backoff_base_ms: 1_000,
            retry_backoff_cap_ms: 10_000,
            price_ttl_ms: 30_000,
            oracle_refresh_ms: 30_000,
            oracle_sanity_bound_pct: dec!(2.0),
        }
    }
}

/// Flash-Loan Orchestrator (C8) tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub pending_deadline_ms: u64,
    pub submission_timeout_ms: u64,
    pub submission_retry_attempts: u32,
    pub pending_poll_interval_ms: u64,
    /// Minimum native-token balance the operator wallet must hold on a
    /// chain for a flash-loan provider to be considered healthy enough to
    /// cover gas for the repayment leg (§4.4 "is_healthy").
    pub min_native_gas_reserve: Decimal,
    pub deadline_secs_from_now: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pending_deadline_ms: 90_000,
            submission_timeout_ms: 30_000,
            submission_retry_attempts: 2,
            pending_poll_interval_ms: 2_000,
            min_native_gas_reserve: dec!(0.05),
            deadline_secs_from_now: 120,
        }
    }
}
