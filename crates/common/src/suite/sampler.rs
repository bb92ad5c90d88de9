use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::provider::NetworkProvider;
use crate::sink::{CsvRecord, CsvSink};

use std::time::Duration;

/// One peer-discovery observation: how many peers were connected at
/// a given tick. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tick: u64,
    pub peer_count: usize,
}

impl CsvRecord for Sample {
    fn csv_line(&self) -> String {
        format!("{},{}", self.tick, self.peer_count)
    }
}

/// Records the connected-peer count once per tick over a fixed
/// observation window.
///
/// A failed peer-count query records zero peers for that tick and
/// the loop continues; a single network hiccup must not abort the
/// run. Each sample is appended to the sink as soon as it is
/// produced.
pub struct PeerCountSampler {
    ticks: u64,
    tick_interval: Duration,
}

impl PeerCountSampler {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            ticks: config.ticks(),
            tick_interval: config.tick_interval(),
        }
    }

    pub async fn run<N: NetworkProvider>(
        &self,
        network: &N,
        sink: &mut CsvSink,
    ) -> Result<Vec<Sample>, HarnessError> {
        let mut samples = Vec::with_capacity(self.ticks as usize);

        for tick in 0..self.ticks {
            let peer_count = match network.connected_peers().await {
                Ok(peers) => peers.len(),
                Err(e) => {
                    tracing::warn!("peer discovery query failed at tick {}: {}", tick, e);
                    0
                }
            };

            let sample = Sample { tick, peer_count };
            sink.append(&sample)?;
            tracing::info!("tick {} ==> {} peers", tick, peer_count);
            samples.push(sample);

            // suspend between ticks only; nothing follows the last one
            if tick + 1 < self.ticks {
                tokio::time::sleep(self.tick_interval).await;
            }
        }

        Ok(samples)
    }
}
