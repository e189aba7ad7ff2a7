//! discovery.rs
//!
//! Brings one endpoint into contact with at least one other endpoint that
//! advertises the same rendezvous key.
//!
//! A round dials the bootstrap addresses, bootstraps the DHT, (re)advertises
//! the rendezvous key, then asks the DHT for its providers and connects to the
//! first one that answers. Every step except the final connect is allowed to
//! fail. Rounds repeat with a growing wait until a connection is made or
//! `max_attempts` runs out. Cancellation interrupts both.

use std::sync::Arc;

use futures::future::join_all;
use libp2p::{Multiaddr, PeerId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::{DiscoveryConfig, P2pConfig},
    error::P2pError,
    ports::PeerTransport,
};

pub struct PeerDiscovery<T: PeerTransport> {
    transport: Arc<T>,
    rendezvous: String,
    bootstrap: Vec<Multiaddr>,
    cfg: DiscoveryConfig,
}

impl<T: PeerTransport> PeerDiscovery<T> {
    pub fn new(
        transport: Arc<T>,
        rendezvous: impl Into<String>,
        bootstrap: Vec<Multiaddr>,
        cfg: DiscoveryConfig,
    ) -> Self {
        Self {
            transport,
            rendezvous: rendezvous.into(),
            bootstrap,
            cfg,
        }
    }

    /// Takes the rendezvous key and bootstrap set from an endpoint config.
    /// Unparseable bootstrap entries are logged and left out.
    pub fn from_config(transport: Arc<T>, p2p: &P2pConfig, cfg: DiscoveryConfig) -> Self {
        let bootstrap = p2p
            .bootstrap
            .iter()
            .filter_map(|b| match b.parse::<Multiaddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("ignoring bootstrap address {b}: {e}");
                    None
                }
            })
            .collect();
        Self::new(transport, p2p.rendezvous.clone(), bootstrap, cfg)
    }

    pub fn rendezvous(&self) -> &str {
        &self.rendezvous
    }

    /// Runs rounds until a rendezvous peer is connected.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<PeerId, P2pError> {
        let attempts = self.cfg.max_attempts.max(1);
        let mut wait = self.cfg.poll_interval();

        for attempt in 1..=attempts {
            let found = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(P2pError::Cancelled),
                found = self.round(attempt) => found,
            };
            if let Some(peer) = found {
                info!(
                    "agent {} found rendezvous peer {peer} on attempt {attempt}",
                    self.transport.local_peer_id()
                );
                return Ok(peer);
            }

            if attempt == attempts {
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(P2pError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
            wait = self.cfg.next_interval(wait);
        }

        Err(P2pError::DiscoveryExhausted { attempts })
    }

    async fn round(&self, attempt: u32) -> Option<PeerId> {
        let local = self.transport.local_peer_id();

        let connected = self.dial_bootstrap().await;
        debug!(
            "agent {local} attempt {attempt}: {connected}/{} bootstrap peers reachable",
            self.bootstrap.len()
        );

        if let Err(e) = self.transport.bootstrap().await {
            debug!("agent {local} dht bootstrap: {e}");
        }
        if let Err(e) = self.transport.advertise(&self.rendezvous).await {
            debug!("agent {local} advertise {}: {e}", self.rendezvous);
        }

        let providers = match self.transport.find_peers(&self.rendezvous).await {
            Ok(providers) => providers,
            Err(e) => {
                debug!("agent {local} provider lookup: {e}");
                return None;
            }
        };

        for peer in providers.into_iter().filter(|p| *p != local) {
            match self.transport.connect(peer).await {
                Ok(()) => return Some(peer),
                Err(e) => debug!("agent {local} could not connect to {peer}: {e}"),
            }
        }
        None
    }

    /// Dials every bootstrap address at once and returns how many answered.
    async fn dial_bootstrap(&self) -> usize {
        let dials = self.bootstrap.iter().map(|addr| async move {
            (addr, self.transport.dial(addr.clone()).await)
        });

        join_all(dials)
            .await
            .into_iter()
            .filter(|(addr, res)| match res {
                Ok(_) => true,
                Err(e) => {
                    debug!("bootstrap dial {addr} failed: {e}");
                    false
                }
            })
            .count()
    }
}
