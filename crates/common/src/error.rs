use std::path::PathBuf;

use crate::config::ConfigError;
use crate::sink::SinkError;

/// Fatal harness failures. Everything else is recovered locally by
/// the component that observed it (see the suite modules).
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// No Network Provider instance could be acquired; nothing was
    /// measured.
    #[error("failed to acquire network provider: {0}")]
    ProviderAcquisition(#[source] anyhow::Error),

    /// A durable output sink could not be written. Measurements meant
    /// to be durable are never silently dropped.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The content request list must be fully readable before the
    /// retrieval benchmark starts.
    #[error("failed to read request list {path}: {source}")]
    RequestList {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
