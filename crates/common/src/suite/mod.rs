pub mod prober;
pub mod retrieval;
pub mod sampler;

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, HarnessConfig};
use crate::error::HarnessError;
use crate::provider::{ContentId, NetworkProvider};
use crate::sink::CsvSink;

use prober::{LatencyAggregate, LatencyProber};
use retrieval::{RetrievalBenchmark, RetrievalCheckpoint};
use sampler::{PeerCountSampler, Sample};

/// Where the suite reads its request list and writes its two
/// time-series sinks.
#[derive(Debug, Clone)]
pub struct SuitePaths {
    /// Newline-delimited content identifiers, read in full up front
    pub request_list: PathBuf,
    /// `tick,peerCount` records, one per discovery sample
    pub peer_series: PathBuf,
    /// `completedCount,cumulativeElapsedMillis` records, one per checkpoint
    pub retrieval_series: PathBuf,
}

/// Everything a finished run measured.
#[derive(Debug)]
pub struct SuiteReport {
    pub samples: Vec<Sample>,
    pub latency: LatencyAggregate,
    pub requests: usize,
    pub checkpoints: Vec<RetrievalCheckpoint>,
    pub failed_retrievals: u64,
}

impl SuiteReport {
    pub fn peak_peer_count(&self) -> usize {
        self.samples.iter().map(|s| s.peer_count).max().unwrap_or(0)
    }
}

/// Drives the three measurement phases, strictly in sequence, against
/// one Network Provider instance: discovery sampling, then latency
/// probing, then retrieval benchmarking.
pub struct BenchmarkSuite {
    config: HarnessConfig,
}

impl BenchmarkSuite {
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the full suite. Takes ownership of the provider and
    /// releases it exactly once, on the success path and on every
    /// failure path alike.
    pub async fn run<N: NetworkProvider>(
        &self,
        network: N,
        paths: &SuitePaths,
    ) -> Result<SuiteReport, HarnessError> {
        let outcome = self.run_phases(&network, paths).await;

        if let Err(e) = network.release().await {
            tracing::warn!("network provider teardown failed: {}", e);
        }

        outcome
    }

    async fn run_phases<N: NetworkProvider>(
        &self,
        network: &N,
        paths: &SuitePaths,
    ) -> Result<SuiteReport, HarnessError> {
        // phase 1: peer discovery sampling
        tracing::info!(
            "sampling peer discovery for {}s at {}s ticks",
            self.config.window_secs,
            self.config.tick_interval_secs
        );
        let mut peer_sink = CsvSink::create(&paths.peer_series)?;
        let samples = PeerCountSampler::new(&self.config)
            .run(network, &mut peer_sink)
            .await?;
        peer_sink.finish()?;

        // phase 2: latency probing
        let latency = LatencyProber::new(self.config.probes_per_peer)
            .run(network)
            .await;
        match latency.average_rtt() {
            Ok(avg) => tracing::info!(
                "{} successful probes ==> avg time {} msec",
                latency.successful_probes(),
                avg.as_millis()
            ),
            Err(e) => tracing::warn!("{}", e),
        }

        // phase 3: retrieval benchmarking
        let requests = read_request_list(&paths.request_list)?;
        tracing::info!("benchmarking {} retrieval requests", requests.len());
        let mut retrieval_sink = CsvSink::create(&paths.retrieval_series)?;
        let (checkpoints, tally) = RetrievalBenchmark::new(self.config.checkpoint_counts.clone())
            .run(network, &requests, &mut retrieval_sink)
            .await?;
        retrieval_sink.finish()?;

        Ok(SuiteReport {
            samples,
            latency,
            requests: requests.len(),
            checkpoints,
            failed_retrievals: tally.failed(),
        })
    }
}

/// Read the whole request list before iteration begins, so the
/// iteration length and checkpoint validity are known up front.
/// Blank lines are kept; their handling is the provider's concern.
fn read_request_list(path: &Path) -> Result<Vec<ContentId>, HarnessError> {
    let raw = std::fs::read_to_string(path).map_err(|source| HarnessError::RequestList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw.lines().map(ContentId::from).collect())
}
