//! agent.rs
//!
//! One simulated agent's round, in either mode.
//!
//! Expert agents own a full libp2p endpoint. The endpoint and its broadcaster
//! are spawned on the run-wide tracker and keep serving peers after this
//! agent has resolved; only discovery and aggregation are bound to the round.

use std::sync::Arc;

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use liars_common::{Mode, Participant};
use liars_consensus::{ConsensusError, PollAggregator, VoteAggregator};
use liars_p2p::{GossipBroadcaster, Libp2pAdapter, P2pError, PeerDiscovery, PeerTransport};
use liars_vault::Vault;

use crate::{config::SimulationConfig, error::AgentError};

/// Everything an agent task shares with the rest of the run.
#[derive(Clone)]
pub struct AgentContext {
    pub vault: Arc<Vault>,
    pub roster: Arc<[Participant]>,
    pub config: Arc<SimulationConfig>,
    /// Cancelled by the round deadline.
    pub round: CancellationToken,
    /// Cancelled once every agent has finished.
    pub run: CancellationToken,
    pub background: TaskTracker,
}

impl AgentContext {
    fn participant(&self, index: usize) -> Result<&Participant, AgentError> {
        self.roster.get(index).ok_or(AgentError::UnknownAgent {
            index,
            len: self.roster.len(),
        })
    }
}

pub async fn run_agent(
    mode: Mode,
    index: usize,
    ctx: AgentContext,
) -> Result<Option<i64>, AgentError> {
    match mode {
        Mode::Expert => run_expert(index, ctx).await,
        Mode::Standard => run_standard(index, ctx).await,
    }
}

/// Polls the vault for everyone else's claim.
pub async fn run_standard(index: usize, ctx: AgentContext) -> Result<Option<i64>, AgentError> {
    ctx.participant(index)?;
    Ok(PollAggregator::new(ctx.vault.clone()).resolve(index, &ctx.roster))
}

/// Discovers peers, gossips its own address and votes until it has heard
/// from every other agent.
pub async fn run_expert(index: usize, ctx: AgentContext) -> Result<Option<i64>, AgentError> {
    let me = ctx.participant(index)?;
    let cfg = &ctx.config;

    let bootstrap = ctx
        .roster
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, p)| p.address.clone())
        .collect();
    let p2p_cfg = cfg.p2p_config(&me.address, bootstrap);

    let (adapter, handle, mut gossip_rx) = Libp2pAdapter::new(p2p_cfg.clone(), ctx.run.clone())?;
    let transport = Arc::new(handle);
    let local_peer = transport.local_peer_id();
    info!("{} up as {local_peer} on {}", me.name, me.address);
    ctx.background.spawn(adapter.run());

    let broadcaster = GossipBroadcaster::new(
        transport.clone(),
        cfg.rendezvous.clone(),
        &me.address,
        cfg.gossip_interval(),
    );
    let name = me.name.clone();
    let run = ctx.run.clone();
    ctx.background.spawn(async move {
        let sent = broadcaster.run(run).await;
        debug!("{name} broadcaster stopped after {sent} publishes");
    });

    let discovery = PeerDiscovery::from_config(transport.clone(), &p2p_cfg, cfg.discovery.clone());
    match discovery.run(&ctx.round).await {
        Ok(peer) => debug!("{} met {peer} under {}", me.name, discovery.rendezvous()),
        Err(P2pError::Cancelled) => return Err(AgentError::Cancelled),
        // bootstrap connections may still carry enough gossip
        Err(e) => warn!("{} discovery: {e}", me.name),
    }

    let mut aggregator = VoteAggregator::new(
        ctx.vault.clone(),
        local_peer,
        me.address.clone(),
        ctx.roster.len(),
        cfg.recheck_interval(),
    );
    match aggregator.run(&mut gossip_rx, &ctx.round).await {
        Ok(value) => Ok(value),
        Err(ConsensusError::Cancelled) => Err(AgentError::Cancelled),
        Err(e) => Err(e.into()),
    }
}
