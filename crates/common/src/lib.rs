/**
 * Harness configuration: the recognized
 *  measurement options, their defaults, and
 *  validation of the sampling window shape.
 */
pub mod config;
/**
 * Error taxonomy for the harness. Fatal
 *  conditions only; each measurement component
 *  recovers from its own transient failures.
 */
pub mod error;
/**
 * The Network Provider seam. Everything the
 *  measurement components know about the
 *  underlying P2P stack goes through this trait.
 */
pub mod provider;
/**
 * Flat record sinks. One line per measurement,
 *  truncated at open, flushed as written, so a
 *  crash mid-run preserves partial results.
 */
pub mod sink;
/**
 * The measurement suite: peer discovery
 *  sampling, latency probing, retrieval
 *  benchmarking, and the driver that runs the
 *  three phases in sequence against one
 *  Network Provider instance.
 */
pub mod suite;
/**
 * Scripted in-memory Network Provider for
 *  deterministic harness tests.
 */
pub mod testkit;

pub mod prelude {
    pub use crate::config::{ConfigError, HarnessConfig};
    pub use crate::error::HarnessError;
    pub use crate::provider::{ContentId, NetworkProvider, PeerId, ProbeResult};
    pub use crate::sink::CsvSink;
    pub use crate::suite::prober::{LatencyAggregate, NoSuccessfulProbes};
    pub use crate::suite::retrieval::RetrievalCheckpoint;
    pub use crate::suite::sampler::Sample;
    pub use crate::suite::{BenchmarkSuite, SuitePaths, SuiteReport};
}
