//! Message types carried by the Broker

use super::error::BrokerError;

/// Envelope for every broker delivery
///
/// The body is opaque to the broker. Heartbeats carry no body; targeted
/// requests get their correlation id assigned by the broker on delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<P> {
    pub body: Option<P>,
    pub correlation_id: Option<String>,
    pub sender: String,
}

impl<P> Message<P> {
    /// Create a message carrying a body
    pub fn new(sender: impl Into<String>, body: P) -> Self {
        Self {
            body: Some(body),
            correlation_id: None,
            sender: sender.into(),
        }
    }

    /// Create an empty liveness message for `sender`
    pub fn heartbeat(sender: impl Into<String>) -> Self {
        Self {
            body: None,
            correlation_id: None,
            sender: sender.into(),
        }
    }
}

/// Outcome delivered on a reply channel
///
/// `Ok(None)` is the empty success answer to a heartbeat.
pub type Reply<P> = Result<Option<P>, BrokerError>;
