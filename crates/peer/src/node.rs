use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use iroh::discovery::pkarr::dht::DhtDiscovery;
use iroh::protocol::Router;
use iroh::{Endpoint, NodeAddr, NodeId, SecretKey};
use tokio::sync::Mutex;

use crate::blobs::BlobsStore;
use crate::protocol::{ProbeService, PROBE_ALPN};
use crate::tracker::{PeerSource, PeerTracker};

/// Builder for an ephemeral benchmarking node.
#[derive(Default)]
pub struct NodeBuilder {
    /// UDP port to bind; ephemeral if not set
    port: Option<u16>,
    /// node identity; a fresh disposable one is generated if not set
    secret_key: Option<SecretKey>,
    /// filesystem-backed blob store path; in-memory if not set
    blobs_path: Option<PathBuf>,
    /// skip mainline DHT discovery (local tests, closed networks)
    no_discovery: bool,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn secret_key(mut self, secret_key: SecretKey) -> Self {
        self.secret_key = Some(secret_key);
        self
    }

    pub fn blobs_path(mut self, path: PathBuf) -> Self {
        self.blobs_path = Some(path);
        self
    }

    pub fn disable_discovery(mut self) -> Self {
        self.no_discovery = true;
        self
    }

    /// Spawn the node: bind the endpoint and start serving the blobs
    /// and probe ALPNs.
    pub async fn spawn(self) -> Result<Node> {
        let secret_key = match self.secret_key {
            Some(key) => key,
            None => generate_secret_key()?,
        };

        let blobs = match &self.blobs_path {
            Some(path) => BlobsStore::fs(path)
                .await
                .context("failed to open blobs store")?,
            None => BlobsStore::memory()
                .await
                .context("failed to create in-memory blobs store")?,
        };

        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.port.unwrap_or(0));
        let mut endpoint_builder = Endpoint::builder()
            .secret_key(secret_key.clone())
            .bind_addr_v4(addr);

        if !self.no_discovery {
            let mainline_discovery = DhtDiscovery::builder()
                .secret_key(secret_key.clone())
                .build()
                .map_err(|e| anyhow!("failed to build mainline discovery: {}", e))?;
            endpoint_builder = endpoint_builder.discovery(mainline_discovery);
        }

        let endpoint = endpoint_builder
            .bind()
            .await
            .context("failed to bind endpoint")?;

        let tracker = PeerTracker::new();
        let router = Router::builder(endpoint.clone())
            .accept(iroh_blobs::ALPN, blobs.inner.clone())
            .accept(PROBE_ALPN, ProbeService::new(tracker.clone()))
            .spawn();

        tracing::info!(
            "ephemeral node {} online at {:?}",
            endpoint.node_id(),
            endpoint.bound_sockets()
        );

        Ok(Node {
            endpoint,
            blobs,
            tracker,
            router: Mutex::new(Some(router)),
        })
    }
}

/// One ephemeral participant node: identity, endpoint, blob store,
/// and the registry of peers it believes connected.
#[derive(Debug)]
pub struct Node {
    endpoint: Endpoint,
    blobs: BlobsStore,
    tracker: PeerTracker,
    /// taken on release so teardown happens at most once
    router: Mutex<Option<Router>>,
}

impl Node {
    pub fn builder() -> NodeBuilder {
        NodeBuilder::new()
    }

    pub fn id(&self) -> NodeId {
        self.endpoint.node_id()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn blobs(&self) -> &BlobsStore {
        &self.blobs
    }

    pub fn tracker(&self) -> &PeerTracker {
        &self.tracker
    }

    /// Introduce a known peer up front: add its direct addresses to
    /// the endpoint's address book and record it in the registry.
    pub fn add_bootstrap(&self, addr: NodeAddr) -> Result<()> {
        let node_id = addr.node_id;
        self.endpoint
            .add_node_addr_with_source(addr, "bootstrap")?;
        if self.tracker.record(node_id, PeerSource::Bootstrap) {
            tracing::info!("bootstrap peer {} added", node_id);
        }
        Ok(())
    }

    /// Tear down the router and close the endpoint. Subsequent calls
    /// are no-ops.
    pub async fn shutdown(&self) -> Result<()> {
        let router = self.router.lock().await.take();
        let Some(router) = router else {
            return Ok(());
        };

        router.shutdown().await?;
        self.endpoint.close().await;
        tracing::info!("node {} released", self.endpoint.node_id());
        Ok(())
    }
}

/// Fresh disposable key material for one run.
fn generate_secret_key() -> Result<SecretKey> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| anyhow!("failed to generate key material: {}", e))?;
    Ok(SecretKey::from_bytes(&bytes))
}

/// Parse a bootstrap peer spec: either a bare node id or
/// `<node-id>@<sock-addr>[,<sock-addr>...]`.
pub fn parse_node_addr(s: &str) -> Result<NodeAddr> {
    let s = s.trim();
    match s.split_once('@') {
        None => {
            let id: NodeId = s
                .parse()
                .map_err(|e| anyhow!("invalid node id '{}': {}", s, e))?;
            Ok(NodeAddr::from_parts(id, None, Vec::new()))
        }
        Some((id, addrs)) => {
            let id: NodeId = id
                .parse()
                .map_err(|e| anyhow!("invalid node id '{}': {}", id, e))?;
            let mut sockets = Vec::new();
            for part in addrs.split(',') {
                let socket: SocketAddr = part
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid socket address '{}'", part))?;
                sockets.push(socket);
            }
            Ok(NodeAddr::from_parts(id, None, sockets))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some_node_id() -> NodeId {
        generate_secret_key().unwrap().public()
    }

    #[test]
    fn parses_bare_node_id() {
        let id = some_node_id();
        let addr = parse_node_addr(&id.to_string()).unwrap();
        assert_eq!(addr.node_id, id);
    }

    #[test]
    fn parses_node_id_with_socket_addrs() {
        let id = some_node_id();
        let addr = parse_node_addr(&format!("{}@127.0.0.1:4001,10.0.0.1:4001", id)).unwrap();
        assert_eq!(addr.node_id, id);
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(parse_node_addr("not-a-node-id").is_err());
        let id = some_node_id();
        assert!(parse_node_addr(&format!("{}@not-a-socket", id)).is_err());
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = generate_secret_key().unwrap();
        let b = generate_secret_key().unwrap();
        assert_ne!(a.public(), b.public());
    }
}
