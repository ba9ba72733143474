//! Broker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// How long a peer stays alive without a heartbeat, in milliseconds
    #[serde(rename = "peer-ttl-ms", default = "default_peer_ttl_ms")]
    pub peer_ttl_ms: u64,

    /// Period of the registry sweeper and the pending-request janitor
    #[serde(rename = "sweep-interval-ms", default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Bound on every delivery attempt (broadcast and targeted send)
    #[serde(rename = "delivery-timeout-ms", default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Slots in each peer mailbox
    #[serde(rename = "mailbox-capacity", default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Age after which an unanswered request is purged and its caller told it timed out
    #[serde(rename = "pending-ttl-ms", default = "default_pending_ttl_ms")]
    pub pending_ttl_ms: u64,
}

fn default_peer_ttl_ms() -> u64 {
    debug!("default_peer_ttl_ms: called");
    4_000
}

fn default_sweep_interval_ms() -> u64 {
    debug!("default_sweep_interval_ms: called");
    1_000
}

fn default_delivery_timeout_ms() -> u64 {
    debug!("default_delivery_timeout_ms: called");
    5_000
}

fn default_mailbox_capacity() -> usize {
    debug!("default_mailbox_capacity: called");
    1
}

fn default_pending_ttl_ms() -> u64 {
    debug!("default_pending_ttl_ms: called");
    30_000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        debug!("BrokerConfig::default: called");
        Self {
            peer_ttl_ms: 4_000,
            sweep_interval_ms: 1_000,
            delivery_timeout_ms: 5_000,
            mailbox_capacity: 1,
            pending_ttl_ms: 30_000,
        }
    }
}

impl BrokerConfig {
    /// Peer time-to-live as a Duration
    pub fn peer_ttl(&self) -> Duration {
        Duration::from_millis(self.peer_ttl_ms)
    }

    /// Sweep period as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Delivery timeout as a Duration
    pub fn delivery_timeout(&self) -> Duration {
        debug!(delivery_timeout_ms = %self.delivery_timeout_ms, "BrokerConfig::delivery_timeout: called");
        Duration::from_millis(self.delivery_timeout_ms)
    }

    /// Pending-request time-to-live as a Duration
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_ttl_ms)
    }

    /// Reject settings the broker cannot run with
    pub fn validate(&self) -> eyre::Result<()> {
        if self.peer_ttl_ms == 0 || self.sweep_interval_ms == 0 || self.delivery_timeout_ms == 0 {
            return Err(eyre::eyre!("broker durations must be greater than zero"));
        }
        if self.sweep_interval_ms >= self.peer_ttl_ms {
            return Err(eyre::eyre!(
                "sweep-interval-ms ({}) must be below peer-ttl-ms ({})",
                self.sweep_interval_ms,
                self.peer_ttl_ms
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(eyre::eyre!("mailbox-capacity must be at least 1"));
        }
        if self.pending_ttl_ms == 0 {
            return Err(eyre::eyre!("pending-ttl-ms must be greater than zero"));
        }
        Ok(())
    }
}
