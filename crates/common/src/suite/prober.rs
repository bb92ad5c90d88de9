use crate::provider::NetworkProvider;

use std::time::Duration;

use futures::StreamExt;

/// The peer snapshot was empty, or every probe failed; there is no
/// average to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no successful probes; cannot compute an average round-trip time")]
pub struct NoSuccessfulProbes;

/// Successful round-trip probes folded into one global total.
///
/// Per-peer results are deliberately mixed together; outlier peers
/// are not isolated or weighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyAggregate {
    successful_probes: u64,
    total_rtt: Duration,
}

impl LatencyAggregate {
    pub fn record_success(&mut self, rtt: Duration) {
        self.successful_probes += 1;
        self.total_rtt += rtt;
    }

    pub fn successful_probes(&self) -> u64 {
        self.successful_probes
    }

    pub fn total_rtt(&self) -> Duration {
        self.total_rtt
    }

    /// Mean round-trip time over all successful probes.
    ///
    /// Signals [`NoSuccessfulProbes`] instead of dividing by zero;
    /// callers branch on this before displaying anything numeric.
    pub fn average_rtt(&self) -> Result<Duration, NoSuccessfulProbes> {
        if self.successful_probes == 0 {
            return Err(NoSuccessfulProbes);
        }
        Ok(self.total_rtt / self.successful_probes as u32)
    }
}

/// Issues a fixed number of round-trip probes to every peer in one
/// snapshot of the connected-peer set and aggregates the successes.
pub struct LatencyProber {
    probes_per_peer: u32,
}

impl LatencyProber {
    pub fn new(probes_per_peer: u32) -> Self {
        Self { probes_per_peer }
    }

    /// Take one snapshot of the connected peers and probe each of
    /// them `probes_per_peer` times. No retries beyond that; a peer
    /// failing every probe contributes nothing.
    pub async fn run<N: NetworkProvider>(&self, network: &N) -> LatencyAggregate {
        let snapshot = match network.connected_peers().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!("peer snapshot query failed: {}", e);
                Default::default()
            }
        };

        tracing::info!(
            "probing {} peers, {} probes each",
            snapshot.len(),
            self.probes_per_peer
        );

        let mut aggregate = LatencyAggregate::default();
        for peer in &snapshot {
            let mut probes = network.ping(peer, self.probes_per_peer);
            while let Some(result) = probes.next().await {
                match result.rtt {
                    Some(rtt) => aggregate.record_success(rtt),
                    None => tracing::debug!("probe to {} failed", result.peer),
                }
            }
        }

        aggregate
    }
}
