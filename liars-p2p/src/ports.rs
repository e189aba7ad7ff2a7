use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use tokio::sync::{mpsc, oneshot};

use crate::{adapter::AdapterCmd, error::P2pError};

/// What discovery and the broadcaster need from a network endpoint.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    fn local_peer_id(&self) -> PeerId;

    /// Connects to an address whose peer id is not known yet.
    async fn dial(&self, addr: Multiaddr) -> Result<PeerId, P2pError>;

    /// Connects to a peer found through the DHT. Ok if already connected.
    async fn connect(&self, peer: PeerId) -> Result<(), P2pError>;

    async fn bootstrap(&self) -> Result<(), P2pError>;

    /// Announces this endpoint as a provider of `rendezvous`.
    async fn advertise(&self, rendezvous: &str) -> Result<(), P2pError>;

    async fn find_peers(&self, rendezvous: &str) -> Result<Vec<PeerId>, P2pError>;

    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), P2pError>;
}

#[derive(Clone)]
pub struct AdapterHandle {
    pub peer_id: PeerId,
    pub cmd_tx: mpsc::Sender<AdapterCmd>,
}

impl AdapterHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, P2pError>>) -> AdapterCmd,
    ) -> Result<T, P2pError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply))
            .await
            .map_err(|_| P2pError::AdapterClosed)?;
        rx.await.map_err(|_| P2pError::AdapterClosed)?
    }
}

#[async_trait]
impl PeerTransport for AdapterHandle {
    fn local_peer_id(&self) -> PeerId {
        self.peer_id
    }

    async fn dial(&self, addr: Multiaddr) -> Result<PeerId, P2pError> {
        self.request(|reply| AdapterCmd::Dial { addr, reply }).await
    }

    async fn connect(&self, peer: PeerId) -> Result<(), P2pError> {
        self.request(|reply| AdapterCmd::Connect { peer, reply }).await
    }

    async fn bootstrap(&self) -> Result<(), P2pError> {
        self.request(|reply| AdapterCmd::Bootstrap { reply }).await
    }

    async fn advertise(&self, rendezvous: &str) -> Result<(), P2pError> {
        let key = rendezvous.to_string();
        self.request(|reply| AdapterCmd::Advertise { key, reply }).await
    }

    async fn find_peers(&self, rendezvous: &str) -> Result<Vec<PeerId>, P2pError> {
        let key = rendezvous.to_string();
        self.request(|reply| AdapterCmd::FindPeers { key, reply }).await
    }

    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), P2pError> {
        let topic = topic.to_string();
        self.request(|reply| AdapterCmd::Publish { topic, data, reply }).await
    }
}
