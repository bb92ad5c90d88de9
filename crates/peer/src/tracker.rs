use std::collections::HashMap;
use std::sync::Arc;

use iroh::NodeId;
use parking_lot::RwLock;

/// How a peer entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSource {
    /// supplied up front to seed connectivity
    Bootstrap,
    /// dialed us on a served ALPN
    Inbound,
    /// we reached it ourselves
    Dialed,
}

/// Registry of peers believed connected.
///
/// Written by the protocol accept path and the probe client, read by
/// the harness thread. The first recorded source for a peer wins.
#[derive(Debug, Clone, Default)]
pub struct PeerTracker {
    inner: Arc<RwLock<HashMap<NodeId, PeerSource>>>,
}

impl PeerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a peer. Returns true if it was not already known.
    pub fn record(&self, node: NodeId, source: PeerSource) -> bool {
        let mut inner = self.inner.write();
        if inner.contains_key(&node) {
            return false;
        }
        inner.insert(node, source);
        true
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.inner.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
