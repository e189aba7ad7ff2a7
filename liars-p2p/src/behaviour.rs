use libp2p::{
    gossipsub::{Behaviour as GossipsubBehaviour, IdentTopic},
    identify::Behaviour as IdentifyBehaviour,
    kad::{store::MemoryStore, Behaviour as KademliaBehaviour},
    ping::Behaviour as PingBehaviour,
    swarm::NetworkBehaviour,
};

use crate::error::P2pError;

#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "crate::events::ComposedEvent")]
pub struct AgentBehaviour {
    pub identify: IdentifyBehaviour,
    pub ping: PingBehaviour,
    pub kad: KademliaBehaviour<MemoryStore>,
    pub gossipsub: GossipsubBehaviour,
}

impl AgentBehaviour {
    /// Joins the shared gossip topic named after the rendezvous string.
    pub fn subscribe_rendezvous(&mut self, rendezvous: &str) -> Result<IdentTopic, P2pError> {
        let topic = IdentTopic::new(rendezvous);
        self.gossipsub.subscribe(&topic)?;
        tracing::debug!("gossipsub subscribed -> {}", topic.hash());
        Ok(topic)
    }
}
