use std::time::Duration;

use tokio_util::sync::CancellationToken;

use liars_p2p::{AdapterHandle, GossipMessage, Libp2pAdapter, P2pConfig, PeerTransport};
use tokio::sync::mpsc;

fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    format!("/ip4/127.0.0.1/tcp/{port}")
}

fn spawn_endpoint(
    addr: &str,
    cancel: &CancellationToken,
) -> (AdapterHandle, mpsc::Receiver<GossipMessage>) {
    let cfg = P2pConfig::new(addr, "liarslie-test");
    let (adapter, handle, rx) = Libp2pAdapter::new(cfg, cancel.clone()).unwrap();
    tokio::spawn(adapter.run());
    (handle, rx)
}

#[tokio::test]
async fn test_dial_then_gossip_reaches_peer() {
    let cancel = CancellationToken::new();
    let a_addr = free_addr();
    let b_addr = free_addr();
    let (a, mut a_rx) = spawn_endpoint(&a_addr, &cancel);
    let (b, _b_rx) = spawn_endpoint(&b_addr, &cancel);

    let dialed = b.dial(a_addr.parse().unwrap()).await.unwrap();
    assert_eq!(dialed, a.local_peer_id());

    // a second dial to the same address reuses the connection
    assert_eq!(b.dial(a_addr.parse().unwrap()).await.unwrap(), dialed);

    let received = tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            // publish fails until the subscription has propagated
            let _ = b.publish("liarslie-test", b_addr.as_bytes().to_vec()).await;
            let next = tokio::time::timeout(Duration::from_millis(300), a_rx.recv()).await;
            if let Ok(Some(msg)) = next {
                return msg;
            }
        }
    })
    .await
    .expect("gossip never arrived");

    assert_eq!(received.from, b.local_peer_id());
    assert_eq!(received.address(), Some(b_addr.as_str()));

    cancel.cancel();
}

#[tokio::test]
async fn test_rendezvous_providers_are_found() {
    let cancel = CancellationToken::new();
    let a_addr = free_addr();
    let (a, _a_rx) = spawn_endpoint(&a_addr, &cancel);
    let (b, _b_rx) = spawn_endpoint(&free_addr(), &cancel);

    b.dial(a_addr.parse().unwrap()).await.unwrap();

    let found = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            let _ = a.advertise("liarslie-test").await;
            let _ = b.advertise("liarslie-test").await;
            if let Ok(peers) = b.find_peers("liarslie-test").await {
                if peers.contains(&a.local_peer_id()) {
                    return peers;
                }
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await
    .expect("provider record never found");

    assert!(!found.contains(&b.local_peer_id()));
    b.connect(a.local_peer_id()).await.unwrap();

    cancel.cancel();
}

#[tokio::test]
async fn test_invalid_listen_address_is_rejected() {
    let cfg = P2pConfig::new("not-a-multiaddr", "liarslie-test");
    assert!(Libp2pAdapter::new(cfg, CancellationToken::new()).is_err());
}

#[tokio::test]
async fn test_handle_reports_closed_adapter() {
    let cancel = CancellationToken::new();
    let (a, _rx) = spawn_endpoint(&free_addr(), &cancel);
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(a.bootstrap().await.is_err());
}
