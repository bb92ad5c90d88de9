use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use iroh::endpoint::Connection;
use iroh::protocol::{AcceptError, ProtocolHandler};
use iroh::{Endpoint, NodeId};
use serde::{Deserialize, Serialize};

use common::provider::{PeerId, ProbeResult};

use crate::tracker::{PeerSource, PeerTracker};

/// ALPN identifier for the probe protocol
pub const PROBE_ALPN: &[u8] = b"/swarmbench/probe/1";

/// Probe frames are a handful of bytes; anything larger is a
/// protocol violation
const PROBE_FRAME_LIMIT: usize = 1024;

/// Bound on one probe round trip, connection setup included
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Request half of a probe round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub nonce: u64,
}

/// Reply half; echoes the request nonce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReply {
    pub nonce: u64,
}

/// Serves probe echoes and records the peers that dial us.
///
/// The client opens one bidirectional stream per probe over a single
/// connection; each stream carries one request frame and one reply
/// frame.
#[derive(Debug, Clone)]
pub struct ProbeService {
    tracker: PeerTracker,
}

impl ProbeService {
    pub fn new(tracker: PeerTracker) -> Self {
        Self { tracker }
    }

    async fn echo_streams(conn: Connection) -> Result<(), AcceptError> {
        loop {
            // the connection closing ends the loop
            let (mut send, mut recv) = match conn.accept_bi().await {
                Ok(streams) => streams,
                Err(_) => break,
            };

            let frame = recv
                .read_to_end(PROBE_FRAME_LIMIT)
                .await
                .map_err(|e| AcceptError::from(std::io::Error::other(e)))?;
            let request: ProbeRequest = bincode::deserialize(&frame).map_err(|e| {
                let err: Box<dyn std::error::Error + Send + Sync> =
                    anyhow!("failed to deserialize probe frame: {}", e).into();
                AcceptError::from(err)
            })?;

            let reply = bincode::serialize(&ProbeReply {
                nonce: request.nonce,
            })
            .map_err(|e| {
                let err: Box<dyn std::error::Error + Send + Sync> =
                    anyhow!("failed to serialize probe reply: {}", e).into();
                AcceptError::from(err)
            })?;

            send.write_all(&reply)
                .await
                .map_err(|e| AcceptError::from(std::io::Error::other(e)))?;
            send.finish()
                .map_err(|e| AcceptError::from(std::io::Error::other(e)))?;
        }
        Ok(())
    }
}

// Implement the iroh protocol handler trait so the router can accept
// connections for the probe ALPN
impl ProtocolHandler for ProbeService {
    #[allow(refining_impl_trait)]
    fn accept(&self, conn: Connection) -> BoxFuture<'static, Result<(), AcceptError>> {
        let tracker = self.tracker.clone();
        Box::pin(async move {
            if let Ok(remote) = conn.remote_node_id() {
                if tracker.record(remote, PeerSource::Inbound) {
                    tracing::debug!("peer {} discovered via inbound probe", remote);
                }
            }
            Self::echo_streams(conn).await
        })
    }
}

struct ProbeState {
    conn: Option<Connection>,
    unreachable: bool,
    sent: u32,
}

/// Lazily issue `attempts` probes to one peer.
///
/// Yields exactly `attempts` results; connection setup happens on the
/// first probe, and a peer we cannot reach fails every probe.
pub(crate) fn probe_stream<'a>(
    endpoint: &'a Endpoint,
    tracker: &'a PeerTracker,
    peer: PeerId,
    node_id: NodeId,
    attempts: u32,
) -> impl Stream<Item = ProbeResult> + Send + 'a {
    let state = ProbeState {
        conn: None,
        unreachable: false,
        sent: 0,
    };
    stream::unfold(state, move |mut state| {
        let peer = peer.clone();
        async move {
            if state.sent >= attempts {
                return None;
            }
            state.sent += 1;

            if state.conn.is_none() && !state.unreachable {
                match tokio::time::timeout(PROBE_TIMEOUT, endpoint.connect(node_id, PROBE_ALPN))
                    .await
                {
                    Ok(Ok(conn)) => {
                        tracker.record(node_id, PeerSource::Dialed);
                        state.conn = Some(conn);
                    }
                    Ok(Err(e)) => {
                        tracing::debug!("failed to connect to {} for probing: {}", node_id, e);
                        state.unreachable = true;
                    }
                    Err(_) => {
                        tracing::debug!("connection to {} for probing timed out", node_id);
                        state.unreachable = true;
                    }
                }
            }

            let result = match &state.conn {
                Some(conn) => {
                    match tokio::time::timeout(PROBE_TIMEOUT, probe_once(conn, state.sent as u64))
                        .await
                    {
                        Ok(Ok(rtt)) => ProbeResult::success(peer, rtt),
                        Ok(Err(e)) => {
                            tracing::debug!("probe {} to {} failed: {}", state.sent, node_id, e);
                            ProbeResult::failed(peer)
                        }
                        Err(_) => {
                            tracing::debug!("probe {} to {} timed out", state.sent, node_id);
                            ProbeResult::failed(peer)
                        }
                    }
                }
                None => ProbeResult::failed(peer),
            };

            Some((result, state))
        }
    })
}

/// One request/reply round trip on its own bidirectional stream,
/// timed from open to reply.
async fn probe_once(conn: &Connection, nonce: u64) -> Result<Duration> {
    let started = tokio::time::Instant::now();

    let (mut send, mut recv) = conn
        .open_bi()
        .await
        .map_err(|e| anyhow!("failed to open probe stream: {}", e))?;

    let frame = bincode::serialize(&ProbeRequest { nonce })?;
    send.write_all(&frame)
        .await
        .map_err(|e| anyhow!("failed to write probe: {}", e))?;
    send.finish()
        .map_err(|e| anyhow!("failed to finish probe stream: {}", e))?;

    let reply_frame = recv
        .read_to_end(PROBE_FRAME_LIMIT)
        .await
        .map_err(|e| anyhow!("failed to read probe reply: {}", e))?;
    let reply: ProbeReply = bincode::deserialize(&reply_frame)?;
    if reply.nonce != nonce {
        return Err(anyhow!(
            "probe reply nonce mismatch: sent {}, got {}",
            nonce,
            reply.nonce
        ));
    }

    Ok(started.elapsed())
}
