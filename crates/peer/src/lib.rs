/**
 * Storage layer implementation.
 *  Just a light wrapper around the Iroh-Blobs
 *  protocol: local store, stat, and
 *  provider-directed download.
 */
mod blobs;
/**
 * Ephemeral node construction and teardown:
 *  fresh identity, endpoint with mainline DHT
 *  discovery, and the protocol router.
 */
mod node;
/**
 * The probe wire protocol: a bincode echo
 *  served over its own ALPN, plus the
 *  client-side probe stream that measures
 *  round-trip times.
 */
mod protocol;
/**
 * NetworkProvider implementation mapping the
 *  harness operations onto the node.
 */
mod provider;
/**
 * Registry of peers believed connected:
 *  bootstrap entries, inbound dialers, and
 *  peers we reached ourselves.
 */
mod tracker;

pub use blobs::{BlobsStore, BlobsStoreError};
pub use node::{parse_node_addr, Node, NodeBuilder};
pub use protocol::PROBE_ALPN;
pub use tracker::{PeerSource, PeerTracker};

// Re-export iroh types for convenience
pub use iroh::{NodeAddr, NodeId};
