//! Scripted in-memory Network Provider for deterministic harness
//! tests. Peer-set snapshots, probe RTTs, and retrieval delays are
//! all scripted up front, so measurement semantics can be asserted
//! exactly, with no real networking and (under tokio's paused clock)
//! no real elapsed time.

use crate::provider::{ContentId, NetworkProvider, PeerId, ProbeResult};

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::stream::{self, BoxStream, StreamExt};

#[derive(Debug, Clone)]
enum SnapshotScript {
    /// `connected_peers` returns this set
    Peers(Vec<PeerId>),
    /// `connected_peers` fails transiently
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
enum ProbeScript {
    /// every probe succeeds with this round-trip time
    Rtt(Duration),
    /// every probe fails
    Silent,
}

#[derive(Debug, Clone, Copy)]
struct RetrievalScript {
    delay: Duration,
    succeeds: bool,
}

/// A Network Provider that replays a script.
///
/// Snapshot scripts are consumed one per `connected_peers` call; the
/// last entry repeats once the script runs out (an empty script reads
/// as no peers). Probe and retrieval scripts are keyed by identifier.
pub struct ScriptedNetwork {
    snapshots: Vec<SnapshotScript>,
    snapshot_cursor: AtomicUsize,
    probes: HashMap<PeerId, ProbeScript>,
    retrievals: HashMap<ContentId, RetrievalScript>,
    default_retrieval: Option<RetrievalScript>,
    release_calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            snapshot_cursor: AtomicUsize::new(0),
            probes: HashMap::new(),
            retrievals: HashMap::new(),
            default_retrieval: None,
            release_calls: AtomicUsize::new(0),
        }
    }

    /// Script the next `connected_peers` result.
    pub fn with_snapshot<I, P>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeerId>,
    {
        self.snapshots
            .push(SnapshotScript::Peers(peers.into_iter().map(Into::into).collect()));
        self
    }

    /// Script the next `connected_peers` call to fail transiently.
    pub fn with_unavailable_snapshot(mut self) -> Self {
        self.snapshots.push(SnapshotScript::Unavailable);
        self
    }

    /// All probes to `peer` succeed with a fixed round-trip time.
    pub fn with_peer_rtt(mut self, peer: impl Into<PeerId>, rtt: Duration) -> Self {
        self.probes.insert(peer.into(), ProbeScript::Rtt(rtt));
        self
    }

    /// All probes to `peer` fail.
    pub fn with_silent_peer(mut self, peer: impl Into<PeerId>) -> Self {
        self.probes.insert(peer.into(), ProbeScript::Silent);
        self
    }

    /// Retrieving `content` takes `delay` and succeeds.
    pub fn with_retrieval(mut self, content: impl Into<ContentId>, delay: Duration) -> Self {
        self.retrievals.insert(
            content.into(),
            RetrievalScript {
                delay,
                succeeds: true,
            },
        );
        self
    }

    /// Retrieving `content` takes `delay` and fails.
    pub fn with_failed_retrieval(mut self, content: impl Into<ContentId>, delay: Duration) -> Self {
        self.retrievals.insert(
            content.into(),
            RetrievalScript {
                delay,
                succeeds: false,
            },
        );
        self
    }

    /// Fallback for content without a dedicated script. Without this,
    /// unscripted content fails instantly.
    pub fn with_default_retrieval(mut self, delay: Duration) -> Self {
        self.default_retrieval = Some(RetrievalScript {
            delay,
            succeeds: true,
        });
        self
    }

    /// How many times `release` has been called.
    pub fn release_count(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// How many snapshot queries have been served.
    pub fn snapshot_queries(&self) -> usize {
        self.snapshot_cursor.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NetworkProvider for ScriptedNetwork {
    async fn connected_peers(&self) -> Result<BTreeSet<PeerId>> {
        let cursor = self.snapshot_cursor.fetch_add(1, Ordering::SeqCst);
        if self.snapshots.is_empty() {
            return Ok(BTreeSet::new());
        }
        match &self.snapshots[cursor.min(self.snapshots.len() - 1)] {
            SnapshotScript::Peers(peers) => Ok(peers.iter().cloned().collect()),
            SnapshotScript::Unavailable => Err(anyhow!("scripted discovery outage")),
        }
    }

    fn ping(&self, peer: &PeerId, attempts: u32) -> BoxStream<'_, ProbeResult> {
        let script = self
            .probes
            .get(peer)
            .copied()
            .unwrap_or(ProbeScript::Silent);
        let peer = peer.clone();
        let results: Vec<ProbeResult> = (0..attempts)
            .map(|_| match script {
                ProbeScript::Rtt(rtt) => ProbeResult::success(peer.clone(), rtt),
                ProbeScript::Silent => ProbeResult::failed(peer.clone()),
            })
            .collect();
        stream::iter(results).boxed()
    }

    async fn retrieve(&self, content: &ContentId) -> Result<()> {
        let script = self
            .retrievals
            .get(content)
            .copied()
            .or(self.default_retrieval);
        match script {
            Some(script) => {
                tokio::time::sleep(script.delay).await;
                if script.succeeds {
                    Ok(())
                } else {
                    Err(anyhow!("scripted retrieval failure for {}", content))
                }
            }
            None => Err(anyhow!("no scripted content for {}", content)),
        }
    }

    async fn release(&self) -> Result<()> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshots_replay_in_order_and_repeat() {
        let net = ScriptedNetwork::new()
            .with_snapshot(["a"])
            .with_snapshot(["a", "b"]);

        assert_eq!(net.connected_peers().await.unwrap().len(), 1);
        assert_eq!(net.connected_peers().await.unwrap().len(), 2);
        // script exhausted: last entry repeats
        assert_eq!(net.connected_peers().await.unwrap().len(), 2);
        assert_eq!(net.snapshot_queries(), 3);
    }

    #[tokio::test]
    async fn unscripted_network_has_no_peers() {
        let net = ScriptedNetwork::new();
        assert!(net.connected_peers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn probe_streams_yield_exactly_attempts() {
        let net = ScriptedNetwork::new()
            .with_peer_rtt("a", Duration::from_millis(5))
            .with_silent_peer("b");

        let ok: Vec<_> = net.ping(&"a".into(), 4).collect().await;
        assert_eq!(ok.len(), 4);
        assert!(ok.iter().all(ProbeResult::succeeded));

        let silent: Vec<_> = net.ping(&"b".into(), 3).collect().await;
        assert_eq!(silent.len(), 3);
        assert!(silent.iter().all(|p| !p.succeeded()));

        // unknown peers fail their probes too
        let unknown: Vec<_> = net.ping(&"c".into(), 2).collect().await;
        assert_eq!(unknown.len(), 2);
        assert!(unknown.iter().all(|p| !p.succeeded()));
    }

    #[tokio::test(start_paused = true)]
    async fn retrieval_scripts_take_scripted_time() {
        let net = ScriptedNetwork::new()
            .with_retrieval("cid-ok", Duration::from_millis(120))
            .with_failed_retrieval("cid-bad", Duration::from_millis(30));

        let started = tokio::time::Instant::now();
        net.retrieve(&"cid-ok".into()).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(120));

        let started = tokio::time::Instant::now();
        net.retrieve(&"cid-bad".into()).await.unwrap_err();
        assert_eq!(started.elapsed(), Duration::from_millis(30));

        // unscripted content fails instantly
        let started = tokio::time::Instant::now();
        net.retrieve(&"cid-unknown".into()).await.unwrap_err();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
