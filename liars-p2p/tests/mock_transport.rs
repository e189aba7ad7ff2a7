use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use liars_p2p::{
    DiscoveryConfig, GossipBroadcaster, Multiaddr, P2pError, PeerDiscovery, PeerId, PeerTransport,
};

#[derive(Default)]
struct Calls {
    dials: Vec<Multiaddr>,
    bootstraps: u32,
    advertised: Vec<String>,
    lookups: u32,
    connects: Vec<PeerId>,
    published: Vec<(String, Vec<u8>)>,
}

struct MockTransport {
    local: PeerId,
    reachable: HashSet<Multiaddr>,
    unreachable_peers: HashSet<PeerId>,
    providers_by_round: Mutex<VecDeque<Vec<PeerId>>>,
    publish_failures: Mutex<u32>,
    calls: Mutex<Calls>,
}

impl MockTransport {
    fn new(local: PeerId) -> Self {
        Self {
            local,
            reachable: HashSet::new(),
            unreachable_peers: HashSet::new(),
            providers_by_round: Mutex::new(VecDeque::new()),
            publish_failures: Mutex::new(0),
            calls: Mutex::new(Calls::default()),
        }
    }

    fn with_rounds(self, rounds: Vec<Vec<PeerId>>) -> Self {
        Self { providers_by_round: Mutex::new(rounds.into()), ..self }
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    fn local_peer_id(&self) -> PeerId {
        self.local
    }

    async fn dial(&self, addr: Multiaddr) -> Result<PeerId, P2pError> {
        self.calls.lock().await.dials.push(addr.clone());
        if self.reachable.contains(&addr) {
            Ok(PeerId::random())
        } else {
            Err(P2pError::AdapterClosed)
        }
    }

    async fn connect(&self, peer: PeerId) -> Result<(), P2pError> {
        self.calls.lock().await.connects.push(peer);
        if self.unreachable_peers.contains(&peer) {
            Err(P2pError::Unreachable(peer))
        } else {
            Ok(())
        }
    }

    async fn bootstrap(&self) -> Result<(), P2pError> {
        self.calls.lock().await.bootstraps += 1;
        Err(P2pError::AdapterClosed)
    }

    async fn advertise(&self, rendezvous: &str) -> Result<(), P2pError> {
        self.calls.lock().await.advertised.push(rendezvous.to_string());
        Ok(())
    }

    async fn find_peers(&self, _rendezvous: &str) -> Result<Vec<PeerId>, P2pError> {
        self.calls.lock().await.lookups += 1;
        Ok(self.providers_by_round.lock().await.pop_front().unwrap_or_default())
    }

    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), P2pError> {
        let mut failures = self.publish_failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(P2pError::AdapterClosed);
        }
        self.calls.lock().await.published.push((topic.to_string(), data));
        Ok(())
    }
}

fn fast_discovery(max_attempts: u32) -> DiscoveryConfig {
    DiscoveryConfig {
        poll_interval_ms: 5,
        max_attempts,
        backoff_multiplier: 1.5,
        max_interval_ms: 20,
    }
}

fn addr(port: u16) -> Multiaddr {
    format!("/ip4/127.0.0.1/tcp/{port}").parse().unwrap()
}

#[tokio::test]
async fn test_discovery_connects_to_first_reachable_provider() {
    let local = PeerId::random();
    let dead = PeerId::random();
    let alive = PeerId::random();

    let mut mock = MockTransport::new(local).with_rounds(vec![vec![local, dead, alive]]);
    mock.reachable.insert(addr(41001));
    mock.unreachable_peers.insert(dead);
    let transport = Arc::new(mock);

    let discovery = PeerDiscovery::new(
        transport.clone(),
        "liarslie",
        vec![addr(41001), addr(41002)],
        fast_discovery(5),
    );
    let peer = discovery.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(peer, alive);

    let calls = transport.calls.lock().await;
    assert_eq!(calls.dials.len(), 2);
    assert_eq!(calls.bootstraps, 1);
    assert_eq!(calls.advertised, vec!["liarslie".to_string()]);
    // self is never dialed
    assert_eq!(calls.connects, vec![dead, alive]);
}

#[tokio::test]
async fn test_discovery_readvertises_until_a_provider_appears() {
    let local = PeerId::random();
    let late = PeerId::random();
    let transport = Arc::new(
        MockTransport::new(local).with_rounds(vec![vec![], vec![local], vec![late]]),
    );

    let discovery = PeerDiscovery::new(transport.clone(), "liarslie", vec![], fast_discovery(10));
    assert_eq!(discovery.run(&CancellationToken::new()).await.unwrap(), late);

    let calls = transport.calls.lock().await;
    assert_eq!(calls.lookups, 3);
    assert_eq!(calls.advertised.len(), 3);
}

#[tokio::test]
async fn test_discovery_gives_up_after_max_attempts() {
    let transport = Arc::new(MockTransport::new(PeerId::random()));
    let discovery = PeerDiscovery::new(transport.clone(), "liarslie", vec![], fast_discovery(3));

    let err = discovery.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, P2pError::DiscoveryExhausted { attempts: 3 }));
    assert_eq!(transport.calls.lock().await.lookups, 3);
}

#[tokio::test]
async fn test_discovery_stops_when_cancelled() {
    let transport = Arc::new(MockTransport::new(PeerId::random()));
    let cfg = DiscoveryConfig {
        poll_interval_ms: 60_000,
        max_interval_ms: 60_000,
        ..DiscoveryConfig::default()
    };
    let discovery = PeerDiscovery::new(transport, "liarslie", vec![], cfg);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let res = tokio::time::timeout(Duration::from_secs(5), discovery.run(&cancel))
        .await
        .expect("discovery must observe cancellation");
    assert!(matches!(res, Err(P2pError::Cancelled)));
}

#[tokio::test]
async fn test_broadcaster_retries_failed_publishes() {
    let mock = MockTransport::new(PeerId::random());
    *mock.publish_failures.lock().await = 2;
    let transport = Arc::new(mock);

    let broadcaster = GossipBroadcaster::new(
        transport.clone(),
        "liarslie",
        "/ip4/127.0.0.1/tcp/41001",
        Duration::from_millis(5),
    );
    let cancel = CancellationToken::new();
    let task = tokio::spawn(broadcaster.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let sent = task.await.unwrap();

    let calls = transport.calls.lock().await;
    assert!(sent >= 1);
    assert_eq!(sent as usize, calls.published.len());
    for (topic, data) in &calls.published {
        assert_eq!(topic, "liarslie");
        assert_eq!(data.as_slice(), b"/ip4/127.0.0.1/tcp/41001");
    }
}

#[tokio::test]
async fn test_broadcaster_cancelled_up_front_sends_nothing() {
    let transport = Arc::new(MockTransport::new(PeerId::random()));
    let broadcaster =
        GossipBroadcaster::new(transport.clone(), "liarslie", "addr", Duration::from_millis(5));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(broadcaster.run(cancel).await, 0);
    assert!(transport.calls.lock().await.published.is_empty());
}
