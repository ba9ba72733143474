//! Peer records held by the registry

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::message::Message;

/// Receiving side of a peer's inbound channel
pub type Mailbox<P> = mpsc::Receiver<Message<P>>;

/// Connection metadata for one registered peer
///
/// Cloning a peer clones the mailbox sender; the registry copy is the only
/// long-lived one, so dropping it from the registry closes the mailbox once
/// in-flight deliveries finish.
#[derive(Debug)]
pub struct Peer<P> {
    pub(crate) id: String,
    pub(crate) tx: mpsc::Sender<Message<P>>,
    pub(crate) expires_at: Instant,
}

// Manual impl: P itself need not be Clone to clone a sender.
impl<P> Clone for Peer<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            tx: self.tx.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl<P> Peer<P> {
    pub(crate) fn new(id: impl Into<String>, capacity: usize, ttl: Duration) -> (Self, Mailbox<P>) {
        let (tx, rx) = mpsc::channel(capacity);
        let peer = Self {
            id: id.into(),
            tx,
            expires_at: Instant::now() + ttl,
        };
        (peer, rx)
    }

    /// Identity the peer registered under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Instant after which the sweeper evicts the peer
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Push the expiry out by `ttl` from now
    pub fn wake(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }

    pub fn is_alive(&self, now: Instant) -> bool {
        self.expires_at > now
    }

    /// Whether both records refer to the same mailbox
    pub(crate) fn same_incarnation(&self, other: &Peer<P>) -> bool {
        self.tx.same_channel(&other.tx)
    }
}
