//! Venue configuration.
//!
//! A small YAML file selects the matching mechanism and its timing knobs.
//! Every field has a default, so an empty file (or no file) yields a plain
//! continuous venue.
//!
//! ```yaml
//! mechanism: fba
//! batch_interval_ms: 500
//! rng_seed: 42
//! log_filter: "matchcore=debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Which matching mechanism the venue runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    /// Continuous double auction
    Cda,
    /// Frequent batch auction
    Fba,
    /// Speed-bumped continuous book with midpoint pegs
    Iex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub mechanism: Mechanism,

    /// Order-path delay for the speed-bumped venue, microseconds
    pub speed_bump_us: u64,

    /// Clearing interval for the batch venue, milliseconds
    pub batch_interval_ms: u64,

    /// Seed for intra-batch priority randomization
    pub rng_seed: u64,

    /// `tracing` env-filter directive used when no `RUST_LOG` is set
    pub log_filter: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            mechanism: Mechanism::Cda,
            speed_bump_us: 350,
            batch_interval_ms: 1_000,
            rng_seed: 0,
            log_filter: "info".to_string(),
        }
    }
}

impl VenueConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    #[inline]
    pub fn speed_bump_nanos(&self) -> u64 {
        self.speed_bump_us * 1_000
    }

    #[inline]
    pub fn batch_interval_nanos(&self) -> u64 {
        self.batch_interval_ms * 1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VenueConfig::default();
        assert_eq!(config.mechanism, Mechanism::Cda);
        assert_eq!(config.speed_bump_nanos(), 350_000);
        assert_eq!(config.batch_interval_nanos(), 1_000_000_000);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: VenueConfig = serde_yaml::from_str("mechanism: iex\n").unwrap();
        assert_eq!(config.mechanism, Mechanism::Iex);
        assert_eq!(config.speed_bump_us, 350);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_full_yaml() {
        let yaml = "mechanism: fba\nbatch_interval_ms: 500\nrng_seed: 42\n";
        let config: VenueConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mechanism, Mechanism::Fba);
        assert_eq!(config.batch_interval_ms, 500);
        assert_eq!(config.rng_seed, 42);
    }
}
