//! # Flash-Loan Orchestrator (C8)
//!
//! One Orchestrator per chain, draining that chain's Execution Queue (C7)
//! lane — the "one Executor worker per chain" rule of SPEC_FULL.md §5. At
//! most one Execution is in flight here at a time, which is also what
//! keeps the operator wallet's nonce single-threaded per chain without any
//! nonce-management lock of its own.
//!
//! `execute` drives one dequeued Opportunity through the state machine of
//! §4.8: `Created` -> `Admitting` -> `Building` -> `Simulating` ->
//! `Submitting` -> `Pending` -> {`Succeeded`, `Reverted`}, with `Abandoned`
//! reachable from every state short of `Pending`. Every branch records the
//! transition through the Telemetry Sink and, for Succeeded/Reverted,
//! feeds the outcome back through the Risk Supervisor (C9) so its budget
//! and revert counters stay current — Abandoned outcomes never touch the
//! budget, since nothing reached the chain.

use ethers::abi::Token as AbiToken;
use ethers::providers::Middleware;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use flasharb_config::OrchestratorConfig;
use flasharb_estimator::{estimate, EstimatorConfig, EstimatorInput};
use flasharb_types::{
    ChainId, Execution, ExecutionState, IdGenerator, Opportunity, TelemetryEvent, TerminalReason,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::oracle::{OracleError, PriceOracle};
use crate::queue::ExecutionQueue;
use crate::registry::ChainRuntime;
use crate::risk::{DenialReason, RiskSupervisor};
use crate::telemetry::TelemetrySink;
use crate::units::{decimal_to_u256, u256_to_decimal};

/// Maps a Risk Supervisor admission denial onto the Abandoned reason
/// telemetry and the caller see (§7's error table groups most admission
/// causes under `AdmissionDenied`, but a breaker or budget denial is
/// informative enough on its own to keep distinct).
fn denial_to_terminal_reason(reason: DenialReason) -> TerminalReason {
    match reason {
        DenialReason::KillSwitch => TerminalReason::OperatorHalt,
        DenialReason::BreakerOpen | DenialReason::RevertThreshold => TerminalReason::BreakerOpen,
        DenialReason::BudgetExhausted => TerminalReason::BudgetExhausted,
        DenialReason::AdmissionCooldown => TerminalReason::AdmissionDenied,
    }
}

/// Scales a raw on-chain amount down by `slippage_bps`, the guard value
/// `buildSwapCall`'s `minAmountOut` is derived from (§4.3 invariant: the
/// produced call must revert unless the realized output is at least this).
fn scale_min_out(amount_raw: U256, slippage_bps: u32) -> U256 {
    let slippage_bps = slippage_bps.min(10_000);
    amount_raw * U256::from(10_000 - slippage_bps) / U256::from(10_000u32)
}

pub struct Orchestrator {
    chain_id: ChainId,
    runtime: Arc<ChainRuntime>,
    oracle: Arc<PriceOracle>,
    queue: Arc<ExecutionQueue>,
    risk: Arc<RiskSupervisor>,
    telemetry: TelemetrySink,
    id_gen: Arc<IdGenerator>,
    wallet: LocalWallet,
    estimator_config: EstimatorConfig,
    config: OrchestratorConfig,
    simulation_mode: bool,
    kill_switch: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        chain_id: ChainId,
        runtime: Arc<ChainRuntime>,
        oracle: Arc<PriceOracle>,
        queue: Arc<ExecutionQueue>,
        risk: Arc<RiskSupervisor>,
        telemetry: TelemetrySink,
        id_gen: Arc<IdGenerator>,
        wallet: LocalWallet,
        estimator_config: EstimatorConfig,
        config: OrchestratorConfig,
        simulation_mode: bool,
    ) -> Self {
        let kill_switch = risk.kill_switch_handle();
        Self {
            chain_id,
            runtime,
            oracle,
            queue,
            risk,
            telemetry,
            id_gen,
            wallet: wallet.with_chain_id(chain_id),
            estimator_config,
            config,
            simulation_mode,
            kill_switch,
        }
    }

    /// Drains this chain's queue lane until the kill-switch is set and the
    /// lane is empty (§5: in-flight work finishes, nothing new is taken).
    pub async fn run(self: Arc<Self>) {
        loop {
            let Some(opportunity) = self.queue.dequeue(self.chain_id) else {
                if self.kill_switch.load(Ordering::SeqCst) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            };
            let now_ms = chrono::Utc::now().timestamp_millis();
            let execution = self.execute(opportunity, now_ms).await;
            tracing::info!(
                execution_id = execution.id,
                chain_id = self.chain_id,
                state = ?execution.state,
                reason = ?execution.terminal_reason,
                "execution finalized"
            );
        }
    }

    fn advance(&self, execution: &mut Execution, next: ExecutionState) -> bool {
        let from = execution.state;
        match execution.transition(next) {
            Ok(()) => {
                self.telemetry.emit(TelemetryEvent::ExecutionStateChanged {
                    execution_id: execution.id,
                    from,
                    to: next,
                    reason: None,
                });
                true
            }
            Err(err) => {
                tracing::error!(execution_id = execution.id, %err, "illegal state transition");
                false
            }
        }
    }

    /// Transitions to `Abandoned` with `reason`, finalizes, and emits the
    /// completed-execution telemetry. No on-chain cost, so the Risk
    /// Supervisor's budget/revert counters are untouched (§4.8 failure
    /// semantics).
    fn abandon(&self, execution: &mut Execution, reason: TerminalReason, now_ms: i64) -> Execution {
        let from = execution.state;
        if execution.transition(ExecutionState::Abandoned).is_ok() {
            execution.finalize(reason, now_ms);
            self.telemetry.emit(TelemetryEvent::ExecutionStateChanged {
                execution_id: execution.id,
                from,
                to: ExecutionState::Abandoned,
                reason: Some(reason),
            });
        }
        self.telemetry.emit(TelemetryEvent::ExecutionCompleted {
            execution_id: execution.id,
            outcome: ExecutionState::Abandoned,
            realized_margin: Decimal::ZERO,
            gas_spent_native: Decimal::ZERO,
        });
        execution.clone()
    }

    /// Transitions to a terminal on-chain outcome (`Succeeded`/`Reverted`),
    /// feeds the result back through the Risk Supervisor, and emits
    /// telemetry. Used for both a parsed receipt and an inclusion timeout
    /// (§7: "treated as Reverted for accounting").
    fn finalize_onchain(
        &self,
        execution: &mut Execution,
        outcome: ExecutionState,
        reason: TerminalReason,
        gas_spent_native: Decimal,
        realized_margin: Decimal,
        now_ms: i64,
    ) -> Execution {
        let from = execution.state;
        if execution.transition(outcome).is_ok() {
            execution.realized_margin = Some(realized_margin);
            execution.finalize(reason, now_ms);
            self.telemetry.emit(TelemetryEvent::ExecutionStateChanged {
                execution_id: execution.id,
                from,
                to: outcome,
                reason: Some(reason),
            });
        }
        self.risk.record_terminal(
            self.chain_id,
            outcome,
            gas_spent_native,
            realized_margin,
            now_ms,
            &self.telemetry,
        );
        self.telemetry.emit(TelemetryEvent::ExecutionCompleted {
            execution_id: execution.id,
            outcome,
            realized_margin,
            gas_spent_native,
        });
        execution.clone()
    }

    /// One Opportunity, start to terminal state.
    pub async fn execute(&self, opportunity: Opportunity, now_ms: i64) -> Execution {
        let mut execution = Execution::new(self.id_gen.next(), opportunity.id, self.chain_id, now_ms);

        // --- Admitting --------------------------------------------------
        if !self.advance(&mut execution, ExecutionState::Admitting) {
            return execution;
        }
        if let Err(denial) = self.risk.admit(self.chain_id, opportunity.estimator.gas_cost, now_ms) {
            tracing::warn!(opportunity_id = opportunity.id, ?denial, "admission denied");
            return self.abandon(&mut execution, denial_to_terminal_reason(denial), now_ms);
        }

        // --- Building -----------------------------------------------------
        if !self.advance(&mut execution, ExecutionState::Building) {
            return execution;
        }
        let Some(token_a) = self.runtime.token_by_address(opportunity.token_a) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };
        let Some(token_b) = self.runtime.token_by_address(opportunity.token_b) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };
        let Some(buy_venue) = self.runtime.venues.get(&opportunity.buy_venue) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };
        let Some(sell_venue) = self.runtime.venues.get(&opportunity.sell_venue) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };
        let Some(provider_adapter) = self.runtime.providers.get(&opportunity.provider_key) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };

        let gas_price_wei = match self.runtime.client.get_gas_price().await {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(chain_id = self.chain_id, error = %err, "gas price read failed");
                return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
            }
        };
        let gas_price_native = u256_to_decimal(gas_price_wei, self.runtime.chain.native_decimals);

        let Some(fresh_price) = self.oracle.get_price(self.chain_id, token_a.address, now_ms) else {
            return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
        };
        let trade_size_native = opportunity.input_amount / fresh_price.unit_price.max(Decimal::new(1, 18));
        let amount_in_raw = decimal_to_u256(trade_size_native, token_a.decimals);

        // Mandatory cross-check (§4.2): a pair that has drifted beyond the
        // sanity bound since detection is rejected here, not submitted.
        match self
            .oracle
            .cross_checked_quote(
                self.chain_id,
                &opportunity.buy_venue,
                buy_venue,
                token_a.address,
                token_b.address,
                trade_size_native,
                amount_in_raw,
                now_ms,
            )
            .await
        {
            Ok(_) => {}
            Err(OracleError::Stale(_)) => {
                return self.abandon(&mut execution, TerminalReason::EconomicReject, now_ms);
            }
            Err(_) => {
                return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
            }
        }

        // Fresh round-trip quotes, in the token's own raw units, drive both
        // the rebuilt swap calldata and the re-estimated margin — the
        // freshest numbers SPEC_FULL.md §4.8 requires before Submitting.
        let amount_out_b_raw = match buy_venue.quote(token_a.address, token_b.address, amount_in_raw).await {
            Ok(amount) => amount,
            Err(err) => {
                tracing::warn!(venue = %opportunity.buy_venue, error = %err, "quote failed during build");
                return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
            }
        };
        let amount_back_a_raw = match sell_venue.quote(token_b.address, token_a.address, amount_out_b_raw).await {
            Ok(amount) => amount,
            Err(err) => {
                tracing::warn!(venue = %opportunity.sell_venue, error = %err, "quote failed during build");
                return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
            }
        };
        let final_amount_a = u256_to_decimal(amount_back_a_raw, token_a.decimals);

        let native_price_usd = self
            .runtime
            .native_token
            .and_then(|addr| self.oracle.get_price(self.chain_id, addr, now_ms))
            .map(|p| p.unit_price)
            .unwrap_or(Decimal::ONE);

        let price_delta_fraction = if trade_size_native > Decimal::ZERO {
            (final_amount_a - trade_size_native) / trade_size_native
        } else {
            Decimal::ZERO
        };
        let estimator_input = EstimatorInput {
            price_delta: price_delta_fraction,
            trade_size: trade_size_native,
            gas_price: gas_price_native,
            gas_units_total: Decimal::from(provider_adapter.provider().gas_units_hint),
            native_price_usd,
            provider_fee_bps: provider_adapter.fee_basis_points(),
            venue_fee_bps_a: buy_venue.fee_bps(),
            venue_fee_bps_b: sell_venue.fee_bps(),
            depth_a: fresh_price.volume_24h,
            depth_b: fresh_price.volume_24h,
        };
        let fresh_output = estimate(&estimator_input, &self.estimator_config);
        if !fresh_output.profitable {
            tracing::info!(
                opportunity_id = opportunity.id,
                net_margin_bps = %fresh_output.net_margin_bps,
                "margin collapsed on rebuild"
            );
            return self.abandon(&mut execution, TerminalReason::EconomicReject, now_ms);
        }

        let min_out_b_raw = scale_min_out(amount_out_b_raw, self.estimator_config.max_slippage_bps);
        let min_out_a_raw = scale_min_out(amount_back_a_raw, self.estimator_config.max_slippage_bps);
        let callback_receiver = self.runtime.chain.callback_receiver;

        let swap_call_a = match buy_venue.build_swap_call(
            token_a.address,
            token_b.address,
            amount_in_raw,
            min_out_b_raw,
            callback_receiver,
            self.config.deadline_secs_from_now,
        ) {
            Ok(call) => call,
            Err(_) => return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms),
        };
        let swap_call_b = match sell_venue.build_swap_call(
            token_b.address,
            token_a.address,
            amount_out_b_raw,
            min_out_a_raw,
            callback_receiver,
            self.config.deadline_secs_from_now,
        ) {
            Ok(call) => call,
            Err(_) => return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms),
        };

        let min_profit_raw = decimal_to_u256(fresh_output.net_profit.max(Decimal::ZERO), token_a.decimals);
        let inner_payload = ethers::abi::encode(&[
            AbiToken::Address(buy_venue.router_address()),
            AbiToken::Address(sell_venue.router_address()),
            AbiToken::Bytes(swap_call_a.to_vec()),
            AbiToken::Bytes(swap_call_b.to_vec()),
            AbiToken::Uint(min_profit_raw),
        ]);

        let flash_tx = match provider_adapter.build_borrow_tx(
            callback_receiver,
            token_a.address,
            amount_in_raw,
            Bytes::from(inner_payload),
        ) {
            Ok(tx) => tx,
            Err(err) => {
                tracing::warn!(provider = %opportunity.provider_key, error = %err, "borrow tx build failed");
                return self.abandon(&mut execution, TerminalReason::BuildFailure, now_ms);
            }
        };

        // --- Simulating -----------------------------------------------------
        if !self.advance(&mut execution, ExecutionState::Simulating) {
            return execution;
        }
        let sim_request: TypedTransaction = TransactionRequest::new()
            .to(flash_tx.to)
            .data(flash_tx.calldata.clone())
            .from(self.wallet.address())
            .into();
        if let Err(err) = self.runtime.client.call(&sim_request, None).await {
            tracing::warn!(execution_id = execution.id, error = %err, "simulation reverted");
            return self.abandon(&mut execution, TerminalReason::SimulationFailure, now_ms);
        }

        if self.simulation_mode {
            return self.abandon(&mut execution, TerminalReason::SimulationMode, now_ms);
        }

        // --- Submitting -----------------------------------------------------
        if !self.advance(&mut execution, ExecutionState::Submitting) {
            return execution;
        }
        // Snapshot the operator's balance of the borrowed token before
        // submission so realized margin can be measured by differencing
        // once the receipt lands, instead of trusting the pre-trade estimate.
        let erc20 = flasharb_flashloan::IERC20::new(token_a.address, self.runtime.client.clone());
        let pre_trade_balance_raw = erc20
            .balance_of(self.wallet.address())
            .call()
            .await
            .unwrap_or_default();
        let gas_limit = U256::from(provider_adapter.provider().gas_units_hint.saturating_mul(2));
        let submit_deadline = Instant::now() + Duration::from_millis(self.config.submission_timeout_ms);
        let mut tx_hash = None;
        let mut attempts = 0u32;
        while attempts <= self.config.submission_retry_attempts {
            attempts += 1;
            let nonce = match self.runtime.client.get_transaction_count(self.wallet.address(), None).await {
                Ok(nonce) => nonce,
                Err(_) => continue,
            };
            let gas_price = match self.runtime.client.get_gas_price().await {
                Ok(price) => price,
                Err(_) => continue,
            };
            let request = TransactionRequest::new()
                .to(flash_tx.to)
                .data(flash_tx.calldata.clone())
                .gas(gas_limit)
                .gas_price(gas_price)
                .nonce(nonce)
                .chain_id(self.chain_id);
            let typed: TypedTransaction = request.into();
            let signature = match self.wallet.sign_transaction(&typed).await {
                Ok(sig) => sig,
                Err(_) => continue,
            };
            let raw = typed.rlp_signed(&signature);

            let remaining = submit_deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.runtime.client.send_raw_transaction(raw)).await {
                Ok(Ok(pending)) => {
                    tx_hash = Some(pending.tx_hash());
                    break;
                }
                Ok(Err(err)) => {
                    tracing::warn!(execution_id = execution.id, attempt = attempts, error = %err, "submission failed");
                }
                Err(_) => {
                    tracing::warn!(execution_id = execution.id, attempt = attempts, "submission timed out");
                }
            }
        }
        let Some(tx_hash) = tx_hash else {
            return self.abandon(&mut execution, TerminalReason::SubmissionFailure, now_ms);
        };
        execution.tx_hash = Some(tx_hash);

        // --- Pending -----------------------------------------------------
        if !self.advance(&mut execution, ExecutionState::Pending) {
            return execution;
        }
        let pending_deadline = Instant::now() + Duration::from_millis(self.config.pending_deadline_ms);
        loop {
            if Instant::now() >= pending_deadline {
                return self.finalize_onchain(
                    &mut execution,
                    ExecutionState::Reverted,
                    TerminalReason::InclusionTimeout,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    chrono::Utc::now().timestamp_millis(),
                );
            }
            match self.runtime.client.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    let finalized_at = chrono::Utc::now().timestamp_millis();
                    let succeeded = receipt.status.map(|s| s == U256::from(1)).unwrap_or(false);
                    let effective_gas_price = receipt.effective_gas_price.unwrap_or(gas_price_wei);
                    let gas_used = receipt.gas_used.unwrap_or_default();
                    execution.gas_used = Some(gas_used);
                    let gas_spent_native =
                        u256_to_decimal(gas_used * effective_gas_price, self.runtime.chain.native_decimals);
                    let (outcome, reason, realized_margin) = if succeeded {
                        // Measure, don't estimate: difference the operator's
                        // post-trade balance against the pre-trade snapshot
                        // rather than trusting the estimator's net_profit.
                        let post_trade_balance_raw = erc20
                            .balance_of(self.wallet.address())
                            .call()
                            .await
                            .unwrap_or(pre_trade_balance_raw);
                        let realized_raw = post_trade_balance_raw
                            .checked_sub(pre_trade_balance_raw)
                            .unwrap_or_default();
                        let realized = u256_to_decimal(realized_raw, token_a.decimals);
                        (ExecutionState::Succeeded, TerminalReason::Succeeded, realized)
                    } else {
                        (ExecutionState::Reverted, TerminalReason::Reverted, Decimal::ZERO)
                    };
                    return self.finalize_onchain(
                        &mut execution,
                        outcome,
                        reason,
                        gas_spent_native,
                        realized_margin,
                        finalized_at,
                    );
                }
                Ok(None) => {
                    tokio::time::sleep(Duration::from_millis(self.config.pending_poll_interval_ms)).await;
                }
                Err(err) => {
                    tracing::warn!(execution_id = execution.id, error = %err, "receipt poll failed");
                    tokio::time::sleep(Duration::from_millis(self.config.pending_poll_interval_ms)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_switch_denial_maps_to_operator_halt() {
        assert_eq!(
            denial_to_terminal_reason(DenialReason::KillSwitch),
            TerminalReason::OperatorHalt
        );
    }

    #[test]
    fn breaker_and_revert_threshold_denials_both_map_to_breaker_open() {
        assert_eq!(
            denial_to_terminal_reason(DenialReason::BreakerOpen),
            TerminalReason::BreakerOpen
        );
        assert_eq!(
            denial_to_terminal_reason(DenialReason::RevertThreshold),
            TerminalReason::BreakerOpen
        );
    }

    #[test]
    fn scale_min_out_applies_slippage_bound() {
        let amount = U256::from(10_000u64);
        assert_eq!(scale_min_out(amount, 100), U256::from(9_900u64));
        assert_eq!(scale_min_out(amount, 0), amount);
    }

    #[test]
    fn scale_min_out_clamps_slippage_above_100_percent() {
        let amount = U256::from(10_000u64);
        assert_eq!(scale_min_out(amount, 20_000), U256::zero());
    }
}
