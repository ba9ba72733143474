//! Peer registry with liveness expiry

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::peer::{Mailbox, Peer};
use super::sweeper::Sweeper;

type PeerMap<P> = RwLock<HashMap<String, Peer<P>>>;

/// Tracks live peers and evicts the ones whose expiry has passed
///
/// Every operation goes through one reader/writer lock; a sweep holds the
/// write lock for its whole pass.
pub struct PeerRegistry<P> {
    peers: Arc<PeerMap<P>>,
    ttl: Duration,
    capacity: usize,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<P: Send + 'static> PeerRegistry<P> {
    /// Create an empty registry; call [`PeerRegistry::start`] to begin sweeping
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        debug!(?ttl, capacity, "PeerRegistry::new: called");
        // mpsc channels cannot be created with zero slots
        let capacity = capacity.max(1);
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity,
            sweeper: Mutex::new(None),
        }
    }

    /// Peer time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start the background sweeper; a no-op if it is already running
    pub fn start(&self, period: Duration) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            debug!("PeerRegistry::start: sweeper already running");
            return;
        }
        let peers = self.peers.clone();
        *slot = Some(Sweeper::spawn("peer-registry", period, move || {
            let peers = peers.clone();
            async move {
                sweep_expired(&peers).await;
            }
        }));
    }

    /// Stop the background sweeper and wait for it to exit
    pub async fn shutdown(&self) {
        debug!("PeerRegistry::shutdown: called");
        let sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }

    /// Create and store a peer, replacing any previous record under `id`
    ///
    /// Replacing drops the old mailbox sender, so a consumer of the old
    /// mailbox observes closure.
    pub async fn add(&self, id: &str) -> (Peer<P>, Mailbox<P>) {
        debug!(%id, "PeerRegistry::add: called");
        let (peer, mailbox) = Peer::new(id, self.capacity, self.ttl);
        let mut peers = self.peers.write().await;
        if peers.insert(id.to_string(), peer.clone()).is_some() {
            info!(peer_id = %id, "Peer re-registered, previous mailbox replaced");
        } else {
            info!(peer_id = %id, "Peer registered");
        }
        (peer, mailbox)
    }

    /// Persist a refreshed record
    ///
    /// Only applies while the stored record is the same incarnation as
    /// `peer`; returns false when the peer was evicted or re-registered in
    /// the meantime.
    pub async fn update(&self, peer: Peer<P>) -> bool {
        debug!(peer_id = %peer.id, "PeerRegistry::update: called");
        let mut peers = self.peers.write().await;
        match peers.get_mut(&peer.id) {
            Some(stored) if stored.same_incarnation(&peer) => {
                *stored = peer;
                true
            }
            _ => {
                debug!(peer_id = %peer.id, "PeerRegistry::update: stale record, ignored");
                false
            }
        }
    }

    pub async fn lookup(&self, id: &str) -> Option<Peer<P>> {
        self.peers.read().await.get(id).cloned()
    }

    /// Snapshot of all stored peers, unordered
    pub async fn list(&self) -> Vec<Peer<P>> {
        self.peers.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Run one eviction pass immediately, returning the evicted ids
    pub async fn sweep(&self) -> Vec<String> {
        sweep_expired(&self.peers).await
    }
}

async fn sweep_expired<P>(peers: &PeerMap<P>) -> Vec<String> {
    let mut peers = peers.write().await;
    let now = Instant::now();
    let expired: Vec<String> = peers
        .values()
        .filter(|p| !p.is_alive(now))
        .map(|p| p.id.clone())
        .collect();

    for id in &expired {
        // Dropping the record drops the registry's sender and closes the mailbox
        peers.remove(id);
        info!(peer_id = %id, "Connection to peer closed, expired");
    }
    expired
}
