use ringkeeper::{ChordPeer, NodeId, PeerConfig, RingEvent};
use std::time::Duration;
use tokio::time::timeout;

fn config(id: u64, join: Option<String>) -> PeerConfig {
    PeerConfig {
        node_id: Some(NodeId::from(id)),
        join,
        stabilize_interval_ms: 60_000,
        check_interval_ms: 60_000,
        fix_fingers_interval_ms: 60_000,
        rpc_timeout_ms: 2_000,
        ..PeerConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_peers_form_a_ring_over_grpc() {
    let mut a = ChordPeer::bind(config(0, None)).await.unwrap();
    a.start().await.unwrap();
    let a_node = a.local().clone();
    assert!(a_node.endpoint.starts_with("127.0.0.1:"));

    let mut b = ChordPeer::bind(config(5, Some(a_node.endpoint.clone())))
        .await
        .unwrap();
    b.start().await.unwrap();
    let b_node = b.local().clone();
    a.maintenance().stabilize().await;

    assert_eq!(a.router().successor(0), b_node);
    assert_eq!(a.router().predecessor(), b_node);
    assert_eq!(b.router().successor(0), a_node);
    assert_eq!(b.router().predecessor(), a_node);

    assert_eq!(b.successor(NodeId::from(3u64)).await.unwrap(), b_node);
    assert_eq!(a.successor(NodeId::from(6u64)).await.unwrap(), a_node);

    let mut a_events = a.subscribe();
    b.shutdown().await;
    let event = timeout(Duration::from_secs(5), a_events.recv())
        .await
        .expect("no event after leave")
        .unwrap();
    assert_eq!(
        event,
        RingEvent::Left {
            node: b_node,
            predecessor: a_node.clone()
        }
    );

    a.maintenance().check_predecessor().await;
    a.maintenance().stabilize().await;
    assert!(!a.router().has_successor());
    assert!(!a.router().has_predecessor());
    assert_eq!(a.router().successor(0), a_node);

    a.shutdown().await;
}

#[tokio::test]
async fn test_join_to_closed_port_fails_without_panicking() {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = probe.local_addr().unwrap().to_string();
    drop(probe);

    let mut peer = ChordPeer::bind(PeerConfig {
        rpc_timeout_ms: 500,
        ..config(9, Some(closed))
    })
    .await
    .unwrap();
    peer.start().await.unwrap();
    assert!(!peer.router().has_successor());
    peer.shutdown().await;
}
