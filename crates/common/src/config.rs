use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Measurement options recognized by the harness core.
///
/// Nothing else is configurable here: input/output locations and
/// provider tuning belong to the binary and the provider respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Total peer-discovery observation window, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Interval between discovery samples, in seconds
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Round-trip probes issued to each connected peer
    #[serde(default = "default_probes_per_peer")]
    pub probes_per_peer: u32,
    /// Retrieval counts at which a cumulative checkpoint is emitted
    #[serde(default = "default_checkpoint_counts")]
    pub checkpoint_counts: BTreeSet<u64>,
}

fn default_window_secs() -> u64 {
    60
}

fn default_tick_interval_secs() -> u64 {
    1
}

fn default_probes_per_peer() -> u32 {
    10
}

fn default_checkpoint_counts() -> BTreeSet<u64> {
    BTreeSet::from([10, 20, 40])
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            probes_per_peer: default_probes_per_peer(),
            checkpoint_counts: default_checkpoint_counts(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Check the window shape and probe counts.
    ///
    /// The window must divide evenly into ticks so that the sample
    /// sequence length is exactly `window_secs / tick_interval_secs`;
    /// an uneven window is rejected rather than truncated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.window_secs % self.tick_interval_secs != 0 {
            return Err(ConfigError::UnevenWindow {
                window_secs: self.window_secs,
                tick_interval_secs: self.tick_interval_secs,
            });
        }
        if self.probes_per_peer == 0 {
            return Err(ConfigError::ZeroProbesPerPeer);
        }
        if self.checkpoint_counts.contains(&0) {
            return Err(ConfigError::ZeroCheckpoint);
        }
        Ok(())
    }

    /// Number of discovery samples a run produces.
    pub fn ticks(&self) -> u64 {
        self.window_secs / self.tick_interval_secs
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sampling window must be a positive number of seconds")]
    ZeroWindow,

    #[error("tick interval must be a positive number of seconds")]
    ZeroTickInterval,

    #[error("sampling window of {window_secs}s does not divide evenly into {tick_interval_secs}s ticks")]
    UnevenWindow {
        window_secs: u64,
        tick_interval_secs: u64,
    },

    #[error("probes per peer must be positive")]
    ZeroProbesPerPeer,

    #[error("checkpoint counts must be positive")]
    ZeroCheckpoint,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
