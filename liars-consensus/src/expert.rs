//! expert.rs
//!
//! Event-driven vote aggregation for one agent.
//!
//! Every gossip message names a peer's vault key. The aggregator looks that
//! peer's claim up in the vault, counts it once per peer, and resolves as soon
//! as it has heard from every other agent (`num_agents - 1` distinct peers).
//! The winning value is written back as the agent's own claim.
//!
//! A message is only counted when both the local and the peer lookups
//! succeed. Otherwise the peer stays uncounted so a later broadcast from it
//! can still count.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use liars_common::Claim;
use liars_p2p::{GossipMessage, PeerId};
use liars_vault::Vault;

use crate::{error::ConsensusError, tally::VoteTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Collecting,
    /// Terminal. `None` when no peer had a value to vote for.
    Resolved(Option<i64>),
}

/// What a single message did to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Sender is this agent or was already counted.
    Ignored,
    /// A lookup failed or missed; the sender stays uncounted.
    Skipped,
    Counted { total: u32 },
    Resolved(Option<i64>),
}

pub struct VoteAggregator {
    vault: Arc<Vault>,
    local_peer: PeerId,
    local_address: String,
    quorum: u32,
    recheck: Duration,
    seen: HashSet<PeerId>,
    tally: VoteTally,
    total_votes: u32,
    state: AggregatorState,
}

impl VoteAggregator {
    pub fn new(
        vault: Arc<Vault>,
        local_peer: PeerId,
        local_address: impl Into<String>,
        num_agents: usize,
        recheck: Duration,
    ) -> Self {
        let quorum = u32::try_from(num_agents.saturating_sub(1)).unwrap_or(u32::MAX);
        Self {
            vault,
            local_peer,
            local_address: local_address.into(),
            quorum,
            recheck,
            seen: HashSet::new(),
            tally: VoteTally::new(),
            total_votes: 0,
            state: AggregatorState::Collecting,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn total_votes(&self) -> u32 {
        self.total_votes
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    /// Applies one gossip message. Once resolved, every further message
    /// reports the resolved value and changes nothing.
    pub fn observe(&mut self, msg: &GossipMessage) -> Result<Observation, ConsensusError> {
        if let AggregatorState::Resolved(value) = self.state {
            return Ok(Observation::Resolved(value));
        }
        if msg.from == self.local_peer || self.seen.contains(&msg.from) {
            return Ok(Observation::Ignored);
        }

        let local = match self.vault.get(&self.local_address) {
            Ok(Some(claim)) => claim,
            Ok(None) => {
                debug!("agent {} has no stored claim yet, skipping vote", self.local_address);
                return Ok(Observation::Skipped);
            }
            Err(e) => {
                warn!("agent {} local lookup failed: {e}", self.local_address);
                return Ok(Observation::Skipped);
            }
        };

        let Some(peer_address) = msg.address() else {
            debug!("dropping non UTF-8 gossip from {}", msg.from);
            return Ok(Observation::Skipped);
        };
        let peer_claim = match self.vault.get(peer_address) {
            Ok(Some(claim)) => claim,
            Ok(None) => {
                debug!("no vault entry for {peer_address}, skipping vote from {}", msg.from);
                return Ok(Observation::Skipped);
            }
            Err(e) => {
                warn!("lookup of {peer_address} failed: {e}");
                return Ok(Observation::Skipped);
            }
        };

        self.seen.insert(msg.from);
        self.total_votes += 1;
        if let Claim::Value(v) = peer_claim {
            // equal values are keep votes for the local claim
            self.tally.record(v);
        }
        info!(
            target: "consensus",
            "EVENT:VOTE agent={} from={} peer_value={} local_value={} votes={}/{}",
            self.local_address, peer_address, peer_claim, local, self.total_votes, self.quorum
        );

        match self.resolve_if_quorum()? {
            Some(value) => Ok(Observation::Resolved(value)),
            None => Ok(Observation::Counted { total: self.total_votes }),
        }
    }

    /// Consumes gossip until quorum and returns the resolved value.
    pub async fn run(
        &mut self,
        rx: &mut mpsc::Receiver<GossipMessage>,
        cancel: &CancellationToken,
    ) -> Result<Option<i64>, ConsensusError> {
        if let Some(value) = self.resolve_if_quorum()? {
            return Ok(value);
        }

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConsensusError::Cancelled),
                msg = rx.recv() => msg.ok_or(ConsensusError::StreamClosed)?,
            };
            if let Observation::Resolved(value) = self.observe(&msg)? {
                return Ok(value);
            }

            // work through whatever is already queued before pausing
            while let Ok(msg) = rx.try_recv() {
                if let Observation::Resolved(value) = self.observe(&msg)? {
                    return Ok(value);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConsensusError::Cancelled),
                _ = tokio::time::sleep(self.recheck) => {}
            }
        }
    }

    fn resolve_if_quorum(&mut self) -> Result<Option<Option<i64>>, ConsensusError> {
        if let AggregatorState::Resolved(value) = self.state {
            return Ok(Some(value));
        }
        if self.total_votes < self.quorum {
            return Ok(None);
        }

        let winner = self.tally.leader();
        if let Some((value, _)) = winner {
            self.vault.put(&self.local_address, Claim::Value(value))?;
        }
        let value = winner.map(|(v, _)| v);
        self.state = AggregatorState::Resolved(value);

        info!(
            target: "consensus",
            "EVENT:RESOLVE agent={} votes={} winner={:?} support={}",
            self.local_address,
            self.total_votes,
            value,
            winner.map(|(_, c)| c).unwrap_or(0)
        );
        Ok(Some(value))
    }
}
