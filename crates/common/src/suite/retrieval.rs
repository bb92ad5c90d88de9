use crate::error::HarnessError;
use crate::provider::{ContentId, NetworkProvider};
use crate::sink::{CsvRecord, CsvSink};

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

/// Running-total measurement emitted at configured retrieval counts
/// only, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalCheckpoint {
    pub completed: u64,
    pub cumulative_elapsed: Duration,
}

impl CsvRecord for RetrievalCheckpoint {
    fn csv_line(&self) -> String {
        format!("{},{}", self.completed, self.cumulative_elapsed.as_millis())
    }
}

/// Accumulation state for the retrieval benchmark, threaded through
/// the request fold as an immutable value so the arithmetic is
/// testable without any network I/O.
///
/// Failed retrievals are timed and counted exactly like successes;
/// the checkpoint data does not distinguish them. The failure count
/// surfaces in the run summary only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalTally {
    completed: u64,
    cumulative_elapsed: Duration,
    failed: u64,
}

impl RetrievalTally {
    /// Fold one request's elapsed time into the running totals.
    pub fn record(self, elapsed: Duration, succeeded: bool) -> Self {
        Self {
            completed: self.completed + 1,
            cumulative_elapsed: self.cumulative_elapsed + elapsed,
            failed: self.failed + u64::from(!succeeded),
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn cumulative_elapsed(&self) -> Duration {
        self.cumulative_elapsed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn checkpoint(&self) -> RetrievalCheckpoint {
        RetrievalCheckpoint {
            completed: self.completed,
            cumulative_elapsed: self.cumulative_elapsed,
        }
    }
}

/// Sequentially retrieves a list of content identifiers, timing every
/// attempt, and emits cumulative checkpoints at the configured counts.
pub struct RetrievalBenchmark {
    checkpoints: BTreeSet<u64>,
}

impl RetrievalBenchmark {
    pub fn new(checkpoints: BTreeSet<u64>) -> Self {
        Self { checkpoints }
    }

    /// Run the benchmark over an already fully-read request list.
    ///
    /// Retrieval failures count toward elapsed time and never halt
    /// the loop. Returns the emitted checkpoints and the final tally.
    pub async fn run<N: NetworkProvider>(
        &self,
        network: &N,
        requests: &[ContentId],
        sink: &mut CsvSink,
    ) -> Result<(Vec<RetrievalCheckpoint>, RetrievalTally), HarnessError> {
        let mut tally = RetrievalTally::default();
        let mut emitted = Vec::new();

        for request in requests {
            let started = Instant::now();
            let outcome = network.retrieve(request).await;
            let elapsed = started.elapsed();

            if let Err(e) = &outcome {
                tracing::debug!("retrieval of {} failed: {}", request, e);
            }
            tally = tally.record(elapsed, outcome.is_ok());

            if self.checkpoints.contains(&tally.completed()) {
                let checkpoint = tally.checkpoint();
                sink.append(&checkpoint)?;
                tracing::info!(
                    "{} get requests ==> time {} msec",
                    checkpoint.completed,
                    checkpoint.cumulative_elapsed.as_millis()
                );
                emitted.push(checkpoint);
            }
        }

        Ok((emitted, tally))
    }
}
