use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::ports::PeerTransport;

/// Periodically publishes an agent's own address on the shared topic.
pub struct GossipBroadcaster<T: PeerTransport> {
    transport: Arc<T>,
    topic: String,
    payload: Vec<u8>,
    interval: Duration,
}

impl<T: PeerTransport> GossipBroadcaster<T> {
    pub fn new(
        transport: Arc<T>,
        topic: impl Into<String>,
        address: &str,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            topic: topic.into(),
            payload: address.as_bytes().to_vec(),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Publishes on every tick until `cancel` fires and returns how many
    /// publishes went through. A failed publish is retried on the next tick.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.transport.publish(&self.topic, self.payload.clone()).await {
                        Ok(()) => {
                            sent += 1;
                            trace!("gossip #{sent} sent on {}", self.topic);
                        }
                        Err(e) => warn!(
                            "agent {} gossip publish failed: {e}",
                            self.transport.local_peer_id()
                        ),
                    }
                }
            }
        }
        sent
    }
}
