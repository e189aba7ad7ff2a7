use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::StreamExt;
use libp2p::{
    core::{upgrade, ConnectedPoint},
    gossipsub::{self, Event as GossipsubEvent, IdentTopic, MessageAuthenticity, ValidationMode},
    identify, identity, kad, noise,
    swarm::{
        dial_opts::DialOpts, Config as SwarmConfig, ConnectionId, DialError, Swarm, SwarmEvent,
    },
    tcp, yamux, Multiaddr, PeerId, Transport,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    behaviour::AgentBehaviour,
    config::P2pConfig,
    error::P2pError,
    events::{ComposedEvent, GossipMessage},
    ports::AdapterHandle,
};

type Reply<T> = oneshot::Sender<Result<T, P2pError>>;

const CMD_BUFFER: usize = 64;

pub enum AdapterCmd {
    Dial { addr: Multiaddr, reply: Reply<PeerId> },
    Connect { peer: PeerId, reply: Reply<()> },
    Bootstrap { reply: Reply<()> },
    Advertise { key: String, reply: Reply<()> },
    FindPeers { key: String, reply: Reply<Vec<PeerId>> },
    Publish { topic: String, data: Vec<u8>, reply: Reply<()> },
}

enum PendingDial {
    Address { addr: Multiaddr, reply: Reply<PeerId> },
    Peer(Reply<()>),
}

struct ProviderQuery {
    found: HashSet<PeerId>,
    reply: Reply<Vec<PeerId>>,
}

/// One simulated agent's libp2p endpoint.
///
/// The swarm lives inside this actor; everything else talks to it through an
/// [`AdapterHandle`]. Gossip received on the rendezvous topic is forwarded to
/// a bounded channel and dropped when that channel is full or closed.
pub struct Libp2pAdapter {
    pub peer_id: PeerId,
    pub swarm: Swarm<AgentBehaviour>,
    cmd_rx: mpsc::Receiver<AdapterCmd>,
    gossip_tx: mpsc::Sender<GossipMessage>,
    cancel: CancellationToken,
    pending_dials: HashMap<ConnectionId, PendingDial>,
    pending_queries: HashMap<kad::QueryId, ProviderQuery>,
    dialed: HashMap<Multiaddr, PeerId>,
}

impl Libp2pAdapter {
    pub fn new(
        cfg: P2pConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, AdapterHandle, mpsc::Receiver<GossipMessage>), P2pError> {
        let key = identity::Keypair::generate_ed25519();
        let peer_id = PeerId::from(key.public());

        // transport
        let transport = tcp::tokio::Transport::new(tcp::Config::default().nodelay(true))
            .upgrade(upgrade::Version::V1Lazy)
            .authenticate(noise::Config::new(&key)?)
            .multiplex(yamux::Config::default())
            .boxed();

        // gossipsub
        let gcfg = gossipsub::ConfigBuilder::default()
            .heartbeat_interval(Duration::from_secs(1))
            .validation_mode(ValidationMode::Strict)
            .build()
            .map_err(|e| P2pError::GossipsubInit(e.to_string()))?;

        let gossipsub = gossipsub::Behaviour::new(MessageAuthenticity::Signed(key.clone()), gcfg)
            .map_err(|e| P2pError::GossipsubInit(e.to_string()))?;

        // identify
        let identify = identify::Behaviour::new(
            identify::Config::new("/liarslie/1.0.0".into(), key.public())
                .with_agent_version("rust-libp2p".into()),
        );

        // kad
        let mut kad_cfg = kad::Config::default();
        kad_cfg.set_query_timeout(cfg.query_timeout());
        let store = kad::store::MemoryStore::new(peer_id);
        let mut kad = kad::Behaviour::with_config(peer_id, store, kad_cfg);
        kad.set_mode(Some(kad::Mode::Server));

        let mut behaviour = AgentBehaviour {
            identify,
            ping: libp2p::ping::Behaviour::default(),
            kad,
            gossipsub,
        };
        behaviour.subscribe_rendezvous(&cfg.rendezvous)?;

        let swarm_cfg = SwarmConfig::with_tokio_executor()
            .with_idle_connection_timeout(cfg.idle_timeout());
        let mut swarm = Swarm::new(transport, behaviour, peer_id, swarm_cfg);

        for ma in &cfg.listen_multiaddrs {
            swarm.listen_on(ma.parse::<Multiaddr>()?)?;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_BUFFER);
        let (gossip_tx, gossip_rx) = mpsc::channel(cfg.gossip_buffer.max(1));

        let adapter = Self {
            peer_id,
            swarm,
            cmd_rx,
            gossip_tx,
            cancel,
            pending_dials: HashMap::new(),
            pending_queries: HashMap::new(),
            dialed: HashMap::new(),
        };
        Ok((adapter, AdapterHandle { peer_id, cmd_tx }, gossip_rx))
    }

    /// Drives the swarm until cancelled or every handle is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                swarm_ev = self.swarm.select_next_some() => self.on_swarm_event(swarm_ev),

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => break,
                },
            }
        }
        debug!("adapter {} stopped", self.peer_id);
    }

    fn on_command(&mut self, cmd: AdapterCmd) {
        match cmd {
            AdapterCmd::Dial { addr, reply } => self.dial_address(addr, reply),

            AdapterCmd::Connect { peer, reply } => self.dial_peer(peer, reply),

            AdapterCmd::Bootstrap { reply } => {
                let res = self
                    .swarm
                    .behaviour_mut()
                    .kad
                    .bootstrap()
                    .map(|_| ())
                    .map_err(P2pError::from);
                let _ = reply.send(res);
            }

            AdapterCmd::Advertise { key, reply } => {
                let res = self
                    .swarm
                    .behaviour_mut()
                    .kad
                    .start_providing(kad::RecordKey::new(&key))
                    .map(|_| ())
                    .map_err(P2pError::from);
                let _ = reply.send(res);
            }

            AdapterCmd::FindPeers { key, reply } => {
                let qid = self
                    .swarm
                    .behaviour_mut()
                    .kad
                    .get_providers(kad::RecordKey::new(&key));
                self.pending_queries.insert(qid, ProviderQuery { found: HashSet::new(), reply });
            }

            AdapterCmd::Publish { topic, data, reply } => {
                let t = IdentTopic::new(topic);
                let res = match self.swarm.behaviour_mut().gossipsub.publish(t.clone(), data) {
                    Ok(id) => {
                        trace!("TX gossipsub ok topic={} id={id}", t.hash());
                        Ok(())
                    }
                    Err(e) => Err(P2pError::from(e)),
                };
                let _ = reply.send(res);
            }
        }
    }

    fn dial_address(&mut self, addr: Multiaddr, reply: Reply<PeerId>) {
        if let Some(peer) = self.dialed.get(&addr) {
            if self.swarm.is_connected(peer) {
                let _ = reply.send(Ok(*peer));
                return;
            }
        }

        let opts = DialOpts::unknown_peer_id().address(addr.clone()).build();
        let connection_id = opts.connection_id();
        match self.swarm.dial(opts) {
            Ok(()) => {
                self.pending_dials.insert(connection_id, PendingDial::Address { addr, reply });
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    fn dial_peer(&mut self, peer: PeerId, reply: Reply<()>) {
        if self.swarm.is_connected(&peer) {
            let _ = reply.send(Ok(()));
            return;
        }

        let opts = DialOpts::peer_id(peer).build();
        let connection_id = opts.connection_id();
        match self.swarm.dial(opts) {
            Ok(()) => {
                self.pending_dials.insert(connection_id, PendingDial::Peer(reply));
            }
            // a connection was established (or is being) in the meantime
            Err(DialError::DialPeerConditionFalse(_)) => {
                let _ = reply.send(Ok(()));
            }
            Err(DialError::NoAddresses) => {
                let _ = reply.send(Err(P2pError::Unreachable(peer)));
            }
            Err(e) => {
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    fn on_swarm_event(&mut self, ev: SwarmEvent<ComposedEvent>) {
        match ev {
            SwarmEvent::Behaviour(ComposedEvent::Identify(identify::Event::Received {
                peer_id,
                info,
                ..
            })) => {
                for addr in info.listen_addrs {
                    self.swarm.behaviour_mut().kad.add_address(&peer_id, addr);
                }
            }

            SwarmEvent::Behaviour(ComposedEvent::Kad(kad::Event::OutboundQueryProgressed {
                id,
                result: kad::QueryResult::GetProviders(res),
                step,
                ..
            })) => self.on_providers(id, res, step.last),

            SwarmEvent::Behaviour(ComposedEvent::Kad(kad::Event::RoutingUpdated { peer, .. })) => {
                trace!("kad routing updated peer={peer}");
            }

            SwarmEvent::Behaviour(ComposedEvent::Gossipsub(GossipsubEvent::Message {
                propagation_source,
                message,
                ..
            })) => {
                let from = message.source.unwrap_or(propagation_source);
                trace!(
                    "RX gossipsub topic={} size={} from={from}",
                    message.topic,
                    message.data.len()
                );

                match self.gossip_tx.try_send(GossipMessage::new(from, message.data)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("gossip buffer full, dropping message from {from}");
                    }
                    // aggregation already finished; peers may still need our gossip
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }

            SwarmEvent::Behaviour(ComposedEvent::Gossipsub(GossipsubEvent::Subscribed {
                peer_id,
                topic,
            })) => {
                debug!("peer {peer_id} subscribed to {topic}");
            }

            SwarmEvent::ConnectionEstablished { peer_id, connection_id, endpoint, .. } => {
                if let ConnectedPoint::Dialer { address, .. } = &endpoint {
                    self.swarm.behaviour_mut().kad.add_address(&peer_id, address.clone());
                }
                match self.pending_dials.remove(&connection_id) {
                    Some(PendingDial::Address { addr, reply }) => {
                        self.dialed.insert(addr, peer_id);
                        let _ = reply.send(Ok(peer_id));
                    }
                    Some(PendingDial::Peer(reply)) => {
                        let _ = reply.send(Ok(()));
                    }
                    None => {}
                }
            }

            SwarmEvent::ConnectionClosed { peer_id, num_established: 0, .. } => {
                self.dialed.retain(|_, p| *p != peer_id);
            }

            SwarmEvent::OutgoingConnectionError { connection_id, peer_id, error } => {
                debug!("outgoing connection error to {:?}: {error}", peer_id);
                match self.pending_dials.remove(&connection_id) {
                    Some(PendingDial::Address { reply, .. }) => {
                        let _ = reply.send(Err(error.into()));
                    }
                    Some(PendingDial::Peer(reply)) => {
                        let _ = reply.send(Err(error.into()));
                    }
                    None => {}
                }
            }

            SwarmEvent::NewListenAddr { address, .. } => {
                info!("agent {} listening on {address}", self.peer_id);
            }

            SwarmEvent::ListenerError { error, .. } => {
                warn!("listener error on {}: {error}", self.peer_id);
            }

            ev => {
                trace!("unhandled swarm event: {:?}", ev);
            }
        }
    }

    fn on_providers(
        &mut self,
        id: kad::QueryId,
        res: Result<kad::GetProvidersOk, kad::GetProvidersError>,
        last: bool,
    ) {
        let done = match res {
            Ok(kad::GetProvidersOk::FoundProviders { providers, .. }) => {
                if let Some(q) = self.pending_queries.get_mut(&id) {
                    q.found.extend(providers);
                }
                last
            }
            Ok(kad::GetProvidersOk::FinishedWithNoAdditionalRecord { .. }) => true,
            Err(e) => {
                // a timeout still returns whatever was collected
                debug!("provider lookup ended early: {e}");
                true
            }
        };

        if !done {
            return;
        }
        if let Some(q) = self.pending_queries.remove(&id) {
            let peers = q.found.into_iter().filter(|p| *p != self.peer_id).collect();
            let _ = q.reply.send(Ok(peers));
        }
    }
}
