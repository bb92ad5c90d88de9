use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures::stream::{self, BoxStream, StreamExt};
use iroh::NodeId;
use iroh_blobs::Hash;

use common::provider::{ContentId, NetworkProvider, PeerId, ProbeResult};

use crate::node::Node;
use crate::protocol;

/// Bound on one retrieval; elapsed time is measured by the harness
/// either way
const RETRIEVE_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait::async_trait]
impl NetworkProvider for Node {
    async fn connected_peers(&self) -> Result<BTreeSet<PeerId>> {
        Ok(self
            .tracker()
            .node_ids()
            .into_iter()
            .map(|id| PeerId::new(id.to_string()))
            .collect())
    }

    fn ping(&self, peer: &PeerId, attempts: u32) -> BoxStream<'_, ProbeResult> {
        match peer.as_str().parse::<NodeId>() {
            Ok(node_id) => {
                protocol::probe_stream(self.endpoint(), self.tracker(), peer.clone(), node_id, attempts)
                    .boxed()
            }
            Err(e) => {
                // still yields `attempts` results, all failed
                tracing::warn!("unparseable peer identifier {}: {}", peer, e);
                let peer = peer.clone();
                stream::iter((0..attempts).map(move |_| ProbeResult::failed(peer.clone()))).boxed()
            }
        }
    }

    async fn retrieve(&self, content: &ContentId) -> Result<()> {
        let hash: Hash = content
            .as_str()
            .parse()
            .map_err(|e| anyhow!("invalid content identifier '{}': {}", content, e))?;

        let providers = self.tracker().node_ids();
        if providers.is_empty() {
            // content already in the local store still counts
            if self.blobs().stat(&hash).await? {
                return Ok(());
            }
            bail!("no connected peers to retrieve {} from", content);
        }

        tokio::time::timeout(
            RETRIEVE_TIMEOUT,
            self.blobs().download(hash, providers, self.endpoint()),
        )
        .await
        .map_err(|_| anyhow!("retrieval of {} timed out", content))??;

        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.shutdown().await
    }
}
