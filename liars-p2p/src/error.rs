use thiserror::Error;

#[derive(Debug, Error)]
pub enum P2pError {
    #[error("gossipsub init error: {0}")]
    GossipsubInit(String),

    #[error("failed to subscribe gossipsub topic: {0}")]
    Subscription(#[from] libp2p::gossipsub::SubscriptionError),

    #[error("gossipsub publish failed: {0}")]
    Publish(#[from] libp2p::gossipsub::PublishError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid multiaddr: {0}")]
    Multiaddr(#[from] libp2p::multiaddr::Error),

    #[error("transport error: {0}")]
    Transport(#[from] libp2p::TransportError<std::io::Error>),

    #[error("dial error: {0}")]
    Dial(#[from] libp2p::swarm::DialError),

    #[error("noise error: {0}")]
    Noise(#[from] libp2p::noise::Error),

    #[error("provider record rejected: {0}")]
    Store(#[from] libp2p::kad::store::Error),

    #[error("kademlia bootstrap: {0}")]
    NoKnownPeers(#[from] libp2p::kad::NoKnownPeers),

    #[error("no route to peer {0}")]
    Unreachable(libp2p::PeerId),

    #[error("no rendezvous peer found after {attempts} attempts")]
    DiscoveryExhausted { attempts: u32 },

    #[error("cancelled")]
    Cancelled,

    #[error("swarm adapter is gone")]
    AdapterClosed,
}
