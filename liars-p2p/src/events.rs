use libp2p::{gossipsub, identify, kad, ping, PeerId};

use gossipsub::Event as GossipsubEvent;
use identify::Event as IdentifyEvent;

#[derive(Debug)]
pub enum ComposedEvent {
    Identify(IdentifyEvent),
    Ping(ping::Event),
    Kad(kad::Event),
    Gossipsub(GossipsubEvent),
}

impl From<IdentifyEvent> for ComposedEvent {
    fn from(e: IdentifyEvent) -> Self {
        Self::Identify(e)
    }
}

impl From<ping::Event> for ComposedEvent {
    fn from(e: ping::Event) -> Self {
        Self::Ping(e)
    }
}

impl From<kad::Event> for ComposedEvent {
    fn from(e: kad::Event) -> Self {
        Self::Kad(e)
    }
}

impl From<GossipsubEvent> for ComposedEvent {
    fn from(e: GossipsubEvent) -> Self {
        Self::Gossipsub(e)
    }
}

/// A gossip message handed from the swarm to the agent.
///
/// `payload` carries the UTF-8 network address of the sender, which is also
/// its vault key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipMessage {
    pub from: PeerId,
    pub payload: Vec<u8>,
}

impl GossipMessage {
    pub fn new(from: PeerId, payload: impl Into<Vec<u8>>) -> Self {
        Self { from, payload: payload.into() }
    }

    /// The sender address, if the payload is valid UTF-8.
    pub fn address(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
