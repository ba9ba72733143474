//! Broker routing and request/reply correlation

use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::BrokerConfig;
use super::error::BrokerError;
use super::message::{Message, Reply};
use super::peer::Mailbox;
use super::pending::PendingRequests;
use super::registry::PeerRegistry;
use super::sweeper::Sweeper;

/// Broker metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerMetrics {
    pub registered_peers: usize,
    pub pending_requests: usize,
}

struct BrokerInner<P> {
    config: BrokerConfig,
    registry: PeerRegistry<P>,
    pending: Arc<PendingRequests<P>>,
    janitor: Mutex<Option<Sweeper>>,
}

/// Routes messages between peers by name or pattern
///
/// The broker is a cheap cloneable handle; every clone shares one peer
/// registry and one pending-request map. Bodies of type `P` are never
/// inspected.
pub struct Broker<P> {
    inner: Arc<BrokerInner<P>>,
}

impl<P> Clone for Broker<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Clone + Send + Sync + 'static> Broker<P> {
    /// Create a broker without background tasks
    pub fn new(config: BrokerConfig) -> Self {
        debug!(?config, "Broker::new: called");
        if let Err(e) = config.validate() {
            warn!(error = %e, "Broker config out of range, clamping where needed");
        }
        let registry = PeerRegistry::new(config.peer_ttl(), config.mailbox_capacity);
        Self {
            inner: Arc::new(BrokerInner {
                config,
                registry,
                pending: Arc::new(PendingRequests::new()),
                janitor: Mutex::new(None),
            }),
        }
    }

    /// Start the peer sweeper and the pending-request janitor
    pub fn start(&self) {
        debug!("Broker::start: called");
        let period = self.inner.config.sweep_interval();
        self.inner.registry.start(period);

        let mut slot = self.inner.janitor.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            let pending = self.inner.pending.clone();
            let max_age = self.inner.config.pending_ttl();
            *slot = Some(Sweeper::spawn("pending-requests", period, move || {
                let pending = pending.clone();
                async move {
                    let purged = pending.purge(max_age).await;
                    if purged > 0 {
                        debug!(purged, "Broker janitor: purged stale pending requests");
                    }
                }
            }));
        }
        info!("Broker started");
    }

    /// Stop background tasks and wait for them to exit
    pub async fn shutdown(&self) {
        debug!("Broker::shutdown: called");
        self.inner.registry.shutdown().await;
        let janitor = self.inner.janitor.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(janitor) = janitor {
            janitor.stop().await;
        }
        info!("Broker stopped");
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Register a peer and return the mailbox its requests arrive on
    ///
    /// Registering an existing or evicted name replaces the old record and
    /// hands back a fresh mailbox.
    pub async fn register(&self, name: &str) -> Mailbox<P> {
        debug!(%name, "Broker::register: called");
        let (_peer, mailbox) = self.inner.registry.add(name).await;
        mailbox
    }

    /// Deliver `msg` to every peer whose name matches `routing_key`
    ///
    /// The key is a regular expression; an empty key matches all peers. Each
    /// delivery runs on its own task bounded by the delivery timeout, and a
    /// delivery that times out is dropped. Returns the number of deliveries
    /// started.
    pub async fn broadcast(&self, routing_key: &str, msg: Message<P>) -> usize {
        debug!(%routing_key, sender = %msg.sender, "Broker::broadcast: called");
        let pattern = if routing_key.is_empty() { ".*" } else { routing_key };
        let exp = match Regex::new(pattern) {
            Ok(exp) => exp,
            Err(e) => {
                warn!(%routing_key, error = %e, "Invalid routing key, broadcast dropped");
                return 0;
            }
        };

        let timeout = self.inner.config.delivery_timeout();
        let mut started = 0;
        for peer in self.inner.registry.list().await {
            if !exp.is_match(&peer.id) {
                continue;
            }
            let msg = msg.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, peer.tx.send(msg)).await {
                    Ok(Ok(())) => debug!(peer_id = %peer.id, "Broadcast delivered"),
                    Ok(Err(_)) => debug!(peer_id = %peer.id, "Mailbox closed, broadcast dropped"),
                    Err(_) => warn!(peer_id = %peer.id, ?timeout, "Broadcast delivery timed out, dropped"),
                }
            });
            started += 1;
        }
        started
    }

    /// Send `msg` to `target` and return the channel its reply arrives on
    ///
    /// An empty `target` is a heartbeat from `msg.sender`: the sender's
    /// expiry is refreshed and the reply is `Ok(None)`, or `NotFound` if the
    /// sender is not registered. Otherwise the message gets a fresh
    /// correlation id and is delivered to `target`; the reply channel later
    /// receives the body passed to [`Broker::response`], `NotFound` when the
    /// target is unknown, or `TimedOut` when delivery does not happen in
    /// time. Exactly one value is sent on the returned channel.
    pub async fn send(&self, target: &str, mut msg: Message<P>) -> oneshot::Receiver<Reply<P>> {
        debug!(%target, sender = %msg.sender, "Broker::send: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        if target.is_empty() {
            let _ = reply_tx.send(self.heartbeat(&msg.sender).await);
            return reply_rx;
        }

        let Some(peer) = self.inner.registry.lookup(target).await else {
            debug!(%target, "Broker::send: target not registered");
            let _ = reply_tx.send(Err(BrokerError::NotFound { id: target.to_string() }));
            return reply_rx;
        };

        let pending = self.inner.pending.clone();
        let timeout = self.inner.config.delivery_timeout();
        tokio::spawn(async move {
            let correlation_id = Uuid::now_v7().to_string();
            msg.correlation_id = Some(correlation_id.clone());

            match tokio::time::timeout(timeout, peer.tx.reserve()).await {
                Ok(Ok(permit)) => {
                    // Track before releasing the message so a fast responder always finds the entry
                    pending.insert(correlation_id.clone(), &peer.id, reply_tx).await;
                    permit.send(msg);
                    debug!(%correlation_id, peer_id = %peer.id, "Request delivered");
                }
                Ok(Err(_)) => {
                    debug!(%correlation_id, peer_id = %peer.id, "Mailbox closed before delivery");
                    let _ = reply_tx.send(Err(BrokerError::NotFound { id: peer.id.clone() }));
                }
                Err(_) => {
                    warn!(%correlation_id, peer_id = %peer.id, ?timeout, "Request delivery timed out");
                    let _ = reply_tx.send(Err(BrokerError::TimedOut {
                        id: peer.id.clone(),
                        after: timeout,
                    }));
                }
            }
        });

        reply_rx
    }

    /// Answer the request tracked under `correlation_id`
    ///
    /// Unknown, already answered or purged ids are ignored.
    pub async fn response(&self, correlation_id: &str, msg: Message<P>) {
        debug!(%correlation_id, sender = %msg.sender, "Broker::response: called");
        let Some(pending) = self.inner.pending.take(correlation_id).await else {
            debug!(%correlation_id, "Broker::response: no pending request");
            return;
        };

        if pending.reply_tx.send(Ok(msg.body)).is_err() {
            warn!(%correlation_id, target = %pending.target, "Caller stopped waiting, response dropped");
        }
    }

    /// Names of all registered peers
    pub async fn get_services(&self) -> Vec<String> {
        debug!("Broker::get_services: called");
        self.inner
            .registry
            .list()
            .await
            .into_iter()
            .map(|p| p.id)
            .collect()
    }

    /// Current registry and pending-map sizes
    pub async fn metrics(&self) -> BrokerMetrics {
        BrokerMetrics {
            registered_peers: self.inner.registry.len().await,
            pending_requests: self.inner.pending.len().await,
        }
    }

    /// Whether a request is still awaiting its response
    pub async fn is_pending(&self, correlation_id: &str) -> bool {
        self.inner.pending.contains(correlation_id).await
    }

    async fn heartbeat(&self, sender: &str) -> Reply<P> {
        debug!(%sender, "Broker::heartbeat: called");
        let registry = &self.inner.registry;
        let not_found = || BrokerError::NotFound { id: sender.to_string() };

        let mut peer = registry.lookup(sender).await.ok_or_else(not_found)?;
        peer.wake(registry.ttl());
        if !registry.update(peer).await {
            return Err(not_found());
        }
        Ok(None)
    }
}
