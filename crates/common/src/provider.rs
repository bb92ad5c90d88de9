use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use anyhow::Result;
use futures::stream::BoxStream;

/// Opaque identifier for another participant in the network.
///
/// The harness never inspects it; the provider maps it to whatever
/// node identity its stack uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque identifier naming a piece of content in the network.
///
/// One per line of the request list. Validation (including blank
/// lines) is the provider's concern, not the harness's.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Outcome of a single round-trip probe. `rtt` is `Some` iff the
/// probe succeeded.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub peer: PeerId,
    pub rtt: Option<Duration>,
}

impl ProbeResult {
    pub fn success(peer: PeerId, rtt: Duration) -> Self {
        Self {
            peer,
            rtt: Some(rtt),
        }
    }

    pub fn failed(peer: PeerId) -> Self {
        Self { peer, rtt: None }
    }

    pub fn succeeded(&self) -> bool {
        self.rtt.is_some()
    }
}

/// The four operations the harness consumes from the underlying P2P
/// stack. Injected so the measurement components can run against a
/// scripted in-memory network in tests.
#[async_trait::async_trait]
pub trait NetworkProvider: Send + Sync {
    /// The set of peers currently believed connected. May fail
    /// transiently; callers treat a failure as an empty set.
    async fn connected_peers(&self) -> Result<BTreeSet<PeerId>>;

    /// Issue `attempts` sequential round-trip probes to one peer.
    ///
    /// Lazy; the stream yields exactly `attempts` results, failed
    /// probes included.
    fn ping(&self, peer: &PeerId, attempts: u32) -> BoxStream<'_, ProbeResult>;

    /// Retrieve one piece of content by identifier. Only success or
    /// failure matters to the harness; the bytes are not consumed.
    async fn retrieve(&self, content: &ContentId) -> Result<()>;

    /// Tear down the node identity and any temporary storage.
    /// Idempotent.
    async fn release(&self) -> Result<()>;
}

#[async_trait::async_trait]
impl<N: NetworkProvider + ?Sized> NetworkProvider for std::sync::Arc<N> {
    async fn connected_peers(&self) -> Result<BTreeSet<PeerId>> {
        (**self).connected_peers().await
    }

    fn ping(&self, peer: &PeerId, attempts: u32) -> BoxStream<'_, ProbeResult> {
        (**self).ping(peer, attempts)
    }

    async fn retrieve(&self, content: &ContentId) -> Result<()> {
        (**self).retrieve(content).await
    }

    async fn release(&self) -> Result<()> {
        (**self).release().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_result_outcomes() {
        let ok = ProbeResult::success("peer-a".into(), Duration::from_millis(42));
        assert!(ok.succeeded());
        assert_eq!(ok.rtt, Some(Duration::from_millis(42)));

        let failed = ProbeResult::failed("peer-b".into());
        assert!(!failed.succeeded());
        assert_eq!(failed.peer.as_str(), "peer-b");
    }

    #[test]
    fn identifiers_are_opaque_strings() {
        let peer = PeerId::new("k51qzi5uqu5d");
        assert_eq!(peer.to_string(), "k51qzi5uqu5d");

        // blank identifiers are representable; rejecting them is the
        // provider's job
        let blank = ContentId::new("");
        assert_eq!(blank.as_str(), "");
    }
}
