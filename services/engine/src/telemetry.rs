//! # Telemetry Sink (C10)
//!
//! An external collaborator by design (SPEC_FULL.md §4.10): the core only
//! requires that emission be non-blocking and lossless under ordinary load.
//! A `tokio::sync::broadcast` channel gives every other component a cheap
//! `emit()` call and lets any number of external consumers `subscribe()`
//! without the emitter ever waiting on them.

use flasharb_types::TelemetryEvent;
use tokio::sync::broadcast;

/// Large enough that a consumer processing one tick's worth of events (at
/// most `top_k` opportunities plus a handful of state transitions) never
/// lags the sender under normal load; a lagging consumer drops its oldest
/// events rather than stalling the emitter.
const CHANNEL_CAPACITY: usize = 4096;

#[derive(Clone)]
pub struct TelemetrySink {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl TelemetrySink {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    /// Non-blocking; errors only when there are currently zero subscribers,
    /// which is a normal condition (no status client attached) and not
    /// worth propagating.
    pub fn emit(&self, event: TelemetryEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flasharb_types::ExecutionState;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let sink = TelemetrySink::new();
        let mut rx = sink.subscribe();
        sink.emit(TelemetryEvent::OpportunityDetected {
            opportunity_id: 1,
            chain_id: 137,
            net_profit: Default::default(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, TelemetryEvent::OpportunityDetected { opportunity_id: 1, .. }));
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let sink = TelemetrySink::new();
        sink.emit(TelemetryEvent::ExecutionStateChanged {
            execution_id: 1,
            from: ExecutionState::Created,
            to: ExecutionState::Admitting,
            reason: None,
        });
    }
}
