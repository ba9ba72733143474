//! Broker error types

use std::time::Duration;
use thiserror::Error;

/// Failures reported on a reply channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("peer not found: {id}")]
    NotFound { id: String },

    #[error("timed out after {after:?} waiting on {id}")]
    TimedOut { id: String, after: Duration },
}

impl BrokerError {
    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, BrokerError::NotFound { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrokerError::TimedOut { .. })
    }
}
