//! Two-node integration tests over loopback.
//!
//! Discovery is disabled; the nodes are introduced directly, the way
//! a closed benchmark network would be bootstrapped.

use common::provider::{ContentId, NetworkProvider, PeerId};
use futures::StreamExt;
use peer::{Node, NodeAddr};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn spawn_local() -> Node {
    Node::builder().disable_discovery().spawn().await.unwrap()
}

fn direct_addr(node: &Node) -> NodeAddr {
    NodeAddr::from_parts(node.id(), None, node.endpoint().bound_sockets())
}

#[tokio::test]
async fn probes_measure_round_trips_between_local_nodes() {
    init_tracing();
    let a = spawn_local().await;
    let b = spawn_local().await;
    a.add_bootstrap(direct_addr(&b)).unwrap();

    let peers = a.connected_peers().await.unwrap();
    assert_eq!(peers.len(), 1);
    let peer = peers.into_iter().next().unwrap();
    assert_eq!(peer.as_str(), b.id().to_string());

    let results: Vec<_> = a.ping(&peer, 3).collect().await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.succeeded()));

    a.release().await.unwrap();
    b.release().await.unwrap();
}

#[tokio::test]
async fn retrieves_content_seeded_on_another_node() {
    init_tracing();
    let a = spawn_local().await;
    let b = spawn_local().await;

    let hash = b.blobs().put(b"benchmark payload".to_vec()).await.unwrap();
    a.add_bootstrap(direct_addr(&b)).unwrap();

    let content = ContentId::new(hash.to_string());
    a.retrieve(&content).await.unwrap();
    assert_eq!(
        a.blobs().get(&hash).await.unwrap().as_ref(),
        b"benchmark payload"
    );

    // second retrieval is served from the local store
    a.retrieve(&content).await.unwrap();

    a.release().await.unwrap();
    b.release().await.unwrap();
}

#[tokio::test]
async fn inbound_probes_register_the_dialer() {
    init_tracing();
    let a = spawn_local().await;
    let b = spawn_local().await;
    a.add_bootstrap(direct_addr(&b)).unwrap();

    // b has never heard of a until a probes it
    assert!(b.connected_peers().await.unwrap().is_empty());

    let peer = a
        .connected_peers()
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    let results: Vec<_> = a.ping(&peer, 1).collect().await;
    assert!(results[0].succeeded());

    let seen_by_b = b.connected_peers().await.unwrap();
    assert!(seen_by_b.contains(&PeerId::new(a.id().to_string())));

    a.release().await.unwrap();
    b.release().await.unwrap();
}

#[tokio::test]
async fn release_is_idempotent() {
    init_tracing();
    let a = spawn_local().await;
    a.release().await.unwrap();
    a.release().await.unwrap();
}

#[tokio::test]
async fn invalid_content_identifier_is_a_retrieval_failure() {
    init_tracing();
    let a = spawn_local().await;

    let err = a.retrieve(&ContentId::new("not a hash")).await.unwrap_err();
    assert!(err.to_string().contains("invalid content identifier"));

    a.release().await.unwrap();
}

#[tokio::test]
async fn retrieval_with_no_peers_fails_fast() {
    init_tracing();
    let a = spawn_local().await;
    let hash = a.blobs().put(b"x".to_vec()).await.unwrap();

    // locally-present content is still a success with no peers
    a.retrieve(&ContentId::new(hash.to_string())).await.unwrap();

    // absent content with an empty registry fails
    let absent = iroh_blobs::Hash::from_bytes([9u8; 32]);
    let err = a
        .retrieve(&ContentId::new(absent.to_string()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no connected peers"));

    a.release().await.unwrap();
}

#[tokio::test]
async fn ping_to_malformed_peer_id_yields_failed_probes() {
    init_tracing();
    let a = spawn_local().await;

    let results: Vec<_> = a.ping(&PeerId::new("garbage"), 4).collect().await;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| !r.succeeded()));

    a.release().await.unwrap();
}
