//! Geo service and nearest-lookup configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the geo service fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Number of services started by the binary
    #[serde(default = "default_count")]
    pub count: usize,

    /// Heartbeat period in milliseconds; keep it well under the peer TTL
    #[serde(rename = "heartbeat-interval-ms", default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Positions are drawn from [-max, max] on both axes
    #[serde(rename = "max-coordinate", default = "default_max_coordinate")]
    pub max_coordinate: i64,

    /// Regex matching the fleet's names; position updates are broadcast to it
    #[serde(rename = "routing-key", default = "default_service_routing_key")]
    pub routing_key: String,
}

fn default_count() -> usize {
    5
}

fn default_heartbeat_interval_ms() -> u64 {
    2_000
}

fn default_max_coordinate() -> i64 {
    1_000
}

fn default_service_routing_key() -> String {
    "^geo-.*".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            count: 5,
            heartbeat_interval_ms: 2_000,
            max_coordinate: 1_000,
            routing_key: default_service_routing_key(),
        }
    }
}

impl ServiceConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Settings for the scatter-gather nearest lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestConfig {
    /// Concurrent senders; caps outstanding requests regardless of fleet size
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,

    /// Regex selecting which registered peers are queried; empty queries all
    #[serde(rename = "routing-key", default = "default_routing_key")]
    pub routing_key: String,
}

fn default_pool_size() -> usize {
    3
}

fn default_routing_key() -> String {
    String::new()
}

impl Default for NearestConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            routing_key: String::new(),
        }
    }
}
