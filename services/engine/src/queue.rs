//! # Execution Queue (C7)
//!
//! A bounded per-chain FIFO lane with admission control (SPEC_FULL.md
//! §4.7). Enqueue never blocks and never rejects: once a lane is full, the
//! lowest-ranked element (by [`rank_key`]) is dropped — the incoming
//! opportunity itself, if it is the lowest-ranked of the two. Dequeue is
//! per-chain and meant to be called by exactly one Executor worker per
//! chain, which is what gives "at most one Execution per chain in flight"
//! (§5) without the queue needing its own lock beyond the lane mutex.

use dashmap::DashMap;
use flasharb_types::{rank_key, ChainId, Opportunity, TelemetryEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::telemetry::TelemetrySink;

pub struct ExecutionQueue {
    capacity: usize,
    lanes: DashMap<ChainId, Mutex<VecDeque<Opportunity>>>,
}

impl ExecutionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lanes: DashMap::new(),
        }
    }

    pub fn enqueue(&self, opportunity: Opportunity, telemetry: &TelemetrySink) {
        let lane_entry = self
            .lanes
            .entry(opportunity.chain_id)
            .or_insert_with(|| Mutex::new(VecDeque::with_capacity(self.capacity)));
        let mut lane = lane_entry.lock();

        if lane.len() >= self.capacity {
            let worst_idx = lane
                .iter()
                .enumerate()
                .min_by_key(|(_, o)| rank_key(o))
                .map(|(idx, _)| idx);

            let new_is_worse = worst_idx
                .map(|idx| rank_key(&opportunity) <= rank_key(&lane[idx]))
                .unwrap_or(false);

            if new_is_worse {
                // The incoming opportunity is not better than anything
                // already queued; it is the one dropped.
                telemetry.emit(TelemetryEvent::OpportunityDropped {
                    opportunity_id: opportunity.id,
                    chain_id: opportunity.chain_id,
                });
                return;
            }

            if let Some(idx) = worst_idx {
                if let Some(dropped) = lane.remove(idx) {
                    telemetry.emit(TelemetryEvent::OpportunityDropped {
                        opportunity_id: dropped.id,
                        chain_id: dropped.chain_id,
                    });
                }
            }
        }

        let id = opportunity.id;
        let chain_id = opportunity.chain_id;
        lane.push_back(opportunity);
        telemetry.emit(TelemetryEvent::OpportunityEnqueued {
            opportunity_id: id,
            chain_id,
        });
    }

    /// Pop the next Opportunity for `chain_id`. Callers must serialize
    /// dequeues per chain themselves (one worker per chain); the queue does
    /// not enforce single-consumer-per-lane beyond the lane's own mutex.
    pub fn dequeue(&self, chain_id: ChainId) -> Option<Opportunity> {
        self.lanes.get(&chain_id).and_then(|lane| lane.lock().pop_front())
    }

    pub fn len(&self, chain_id: ChainId) -> usize {
        self.lanes.get(&chain_id).map(|lane| lane.lock().len()).unwrap_or(0)
    }

    pub fn is_empty(&self, chain_id: ChainId) -> bool {
        self.len(chain_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::Address;
    use flasharb_types::{EstimatorOutput, Recommendation};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn opportunity(id: u64, net_profit: Decimal) -> Opportunity {
        Opportunity {
            id,
            chain_id: 137,
            token_a: Address::zero(),
            token_b: Address::zero(),
            buy_venue: "a".into(),
            sell_venue: "b".into(),
            provider_key: "aave".into(),
            input_amount: dec!(1000),
            estimator: EstimatorOutput {
                gross_profit: net_profit,
                gas_cost: dec!(0),
                loan_fee: dec!(0),
                venue_fees: dec!(0),
                slippage: dec!(0),
                reserve_buffer: dec!(0),
                net_profit,
                net_margin_bps: dec!(30),
                profitable: true,
                confidence: dec!(1),
                recommendation: Recommendation::Buy,
            },
            detected_at_ms: id as i64,
        }
    }

    #[test]
    fn retains_top_n_by_rank_not_arrival_order() {
        let queue = ExecutionQueue::new(2);
        let telemetry = TelemetrySink::new();
        queue.enqueue(opportunity(3, dec!(10)), &telemetry);
        queue.enqueue(opportunity(2, dec!(20)), &telemetry);
        queue.enqueue(opportunity(1, dec!(30)), &telemetry);

        assert_eq!(queue.len(137), 2);
        let mut remaining = Vec::new();
        while let Some(o) = queue.dequeue(137) {
            remaining.push(o.id);
        }
        assert_eq!(remaining, vec![2, 1]);
    }

    #[test]
    fn dropping_emits_opportunity_dropped() {
        let queue = ExecutionQueue::new(1);
        let telemetry = TelemetrySink::new();
        let mut rx = telemetry.subscribe();
        queue.enqueue(opportunity(1, dec!(10)), &telemetry);
        let _ = rx.try_recv().unwrap(); // enqueued event for id 1
        queue.enqueue(opportunity(2, dec!(5)), &telemetry);
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            TelemetryEvent::OpportunityDropped { opportunity_id: 2, .. }
        ));
        assert_eq!(queue.dequeue(137).unwrap().id, 1);
    }

    #[test]
    fn separate_chains_have_independent_lanes() {
        let queue = ExecutionQueue::new(1);
        let telemetry = TelemetrySink::new();
        let mut opp = opportunity(1, dec!(10));
        opp.chain_id = 1;
        queue.enqueue(opp, &telemetry);
        let mut opp2 = opportunity(2, dec!(10));
        opp2.chain_id = 2;
        queue.enqueue(opp2, &telemetry);
        assert_eq!(queue.len(1), 1);
        assert_eq!(queue.len(2), 1);
    }
}
