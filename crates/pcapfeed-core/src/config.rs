//! Ingest configuration.
//!
//! Read once at startup, from defaults, an optional TOML file and command
//! line overrides, in that order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packet::DEFAULT_BUFFER_SIZE;

/// Default in-flight packet threshold for the admission gate.
pub const DEFAULT_MAX_PENDING_PACKETS: usize = 50;

/// Smallest buffer that still holds a minimal Ethernet frame plus headers.
pub const MIN_BUFFER_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Settings consumed by the ingest pipeline.
///
/// # Examples
/// ```
/// use pcapfeed_core::IngestConfig;
///
/// let config = IngestConfig::from_toml_str("max_pending_packets = 8\n")?;
/// assert_eq!(config.max_pending_packets, 8);
/// assert_eq!(config.filter(), None);
/// # Ok::<(), pcapfeed_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Intake blocks while more than this many packets are in flight.
    pub max_pending_packets: usize,
    /// Optional capture filter in libpcap syntax.
    pub bpf_filter: Option<String>,
    /// Capacity of the per-worker packet buffer.
    pub buffer_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_pending_packets: DEFAULT_MAX_PENDING_PACKETS,
            bpf_filter: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl IngestConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: IngestConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pending_packets == 0 {
            return Err(ConfigError::Invalid(
                "max_pending_packets must be at least 1".to_string(),
            ));
        }
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "buffer_size must be at least {MIN_BUFFER_SIZE} bytes, got {}",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// The configured filter, with blank expressions treated as absent.
    pub fn filter(&self) -> Option<&str> {
        self.bpf_filter
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DEFAULT_MAX_PENDING_PACKETS, IngestConfig};

    #[test]
    fn empty_file_yields_defaults() {
        let config = IngestConfig::from_toml_str("").unwrap();
        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.max_pending_packets, DEFAULT_MAX_PENDING_PACKETS);
        assert_eq!(config.buffer_size, 65_535);
    }

    #[test]
    fn reads_all_fields() {
        let config = IngestConfig::from_toml_str(
            "max_pending_packets = 200\nbpf_filter = \"udp\"\nbuffer_size = 9000\n",
        )
        .unwrap();
        assert_eq!(config.max_pending_packets, 200);
        assert_eq!(config.filter(), Some("udp"));
        assert_eq!(config.buffer_size, 9000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = IngestConfig::from_toml_str("max_pending = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_threshold_is_invalid() {
        let err = IngestConfig::from_toml_str("max_pending_packets = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn tiny_buffer_is_invalid() {
        let err = IngestConfig::from_toml_str("buffer_size = 10\n").unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn blank_filter_is_none() {
        let config = IngestConfig {
            bpf_filter: Some("   ".to_string()),
            ..IngestConfig::default()
        };
        assert_eq!(config.filter(), None);
    }
}
