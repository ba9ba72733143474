//! GeoBroker configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::broker::BrokerConfig;
use crate::geo::{NearestConfig, ServiceConfig};

const LOCAL_CONFIG: &str = ".geobroker.yml";

/// Main GeoBroker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Broker timing and mailbox settings
    pub broker: BrokerConfig,

    /// Geo service fleet
    pub service: ServiceConfig,

    /// Nearest-service lookup
    pub nearest: NearestConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.broker.validate()?;
        if self.service.heartbeat_interval_ms == 0 {
            return Err(eyre::eyre!("service heartbeat-interval-ms must be greater than zero"));
        }
        if self.service.heartbeat_interval_ms >= self.broker.peer_ttl_ms {
            tracing::warn!(
                heartbeat_interval_ms = self.service.heartbeat_interval_ms,
                peer_ttl_ms = self.broker.peer_ttl_ms,
                "Heartbeat interval is not below the peer TTL, services will be evicted between heartbeats"
            );
        }
        if self.nearest.pool_size == 0 {
            return Err(eyre::eyre!("nearest pool-size must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; full loading reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::search_paths().into_iter().find(|p| p.exists())?,
        };
        Self::load_from_file(&path).ok()?.log_level
    }

    /// Project-local config first, then the user config directory
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("geobroker").join("geobroker.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.log_level.is_none());
        assert_eq!(config.broker.peer_ttl_ms, 4_000);
        assert_eq!(config.service.count, 5);
        assert_eq!(config.nearest.pool_size, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: DEBUG

broker:
  peer-ttl-ms: 8000
  sweep-interval-ms: 500
  delivery-timeout-ms: 2000
  mailbox-capacity: 16
  pending-ttl-ms: 10000

service:
  count: 12
  heartbeat-interval-ms: 1000
  max-coordinate: 50

nearest:
  pool-size: 6
  routing-key: "^svc-"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(config.broker.peer_ttl_ms, 8_000);
        assert_eq!(config.broker.mailbox_capacity, 16);
        assert_eq!(config.service.count, 12);
        assert_eq!(config.service.max_coordinate, 50);
        assert_eq!(config.nearest.pool_size, 6);
        assert_eq!(config.nearest.routing_key, "^svc-");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
service:
  count: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.service.count, 2);

        // Defaults for unspecified
        assert_eq!(config.service.heartbeat_interval_ms, 2_000);
        assert_eq!(config.broker.delivery_timeout_ms, 5_000);
        assert_eq!(config.service.routing_key, "^geo-.*");
        assert!(config.nearest.routing_key.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = Config::default();
        config.nearest.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: WARN\nservice:\n  count: 3").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.service.count, 3);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_explicit_path_missing_is_error() {
        let path = PathBuf::from("/nonexistent/geobroker.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_load_malformed_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "broker: [not, a, map]").unwrap();
        let path = file.path().to_path_buf();
        assert!(Config::load(Some(&path)).is_err());
    }
}
