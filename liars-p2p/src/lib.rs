pub mod adapter;
pub mod behaviour;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod gossip;
pub mod ports;

pub use adapter::{AdapterCmd, Libp2pAdapter};
pub use config::{DiscoveryConfig, P2pConfig};
pub use discovery::PeerDiscovery;
pub use error::P2pError;
pub use events::GossipMessage;
pub use gossip::GossipBroadcaster;
pub use ports::{AdapterHandle, PeerTransport};


pub use libp2p::{Multiaddr, PeerId};
