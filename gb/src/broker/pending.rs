//! Correlation id -> reply channel tracking

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, oneshot};
use tracing::{debug, warn};

use super::error::BrokerError;
use super::message::Reply;

/// Pending request tracking
pub(crate) struct PendingRequest<P> {
    pub(crate) reply_tx: oneshot::Sender<Reply<P>>,
    pub(crate) target: String,
    created_at: Instant,
}

/// Outstanding requests keyed by correlation id
pub(crate) struct PendingRequests<P> {
    map: RwLock<HashMap<String, PendingRequest<P>>>,
}

impl<P> PendingRequests<P> {
    pub(crate) fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn insert(&self, correlation_id: String, target: &str, reply_tx: oneshot::Sender<Reply<P>>) {
        debug!(%correlation_id, %target, "PendingRequests::insert: called");
        self.map.write().await.insert(
            correlation_id,
            PendingRequest {
                reply_tx,
                target: target.to_string(),
                created_at: Instant::now(),
            },
        );
    }

    /// Remove and return the entry for `correlation_id`
    pub(crate) async fn take(&self, correlation_id: &str) -> Option<PendingRequest<P>> {
        self.map.write().await.remove(correlation_id)
    }

    pub(crate) async fn contains(&self, correlation_id: &str) -> bool {
        self.map.read().await.contains_key(correlation_id)
    }

    pub(crate) async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    /// Drop entries whose caller has gone away or that outlived `max_age`
    ///
    /// A caller still waiting on an aged-out entry receives `TimedOut`.
    /// Returns the number of entries removed.
    pub(crate) async fn purge(&self, max_age: Duration) -> usize {
        let mut map = self.map.write().await;
        let now = Instant::now();
        let stale: Vec<String> = map
            .iter()
            .filter(|(_, p)| p.reply_tx.is_closed() || now.duration_since(p.created_at) >= max_age)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            let Some(pending) = map.remove(id) else {
                continue;
            };
            if pending.reply_tx.is_closed() {
                debug!(correlation_id = %id, target = %pending.target, "Purged abandoned request");
                continue;
            }
            warn!(correlation_id = %id, target = %pending.target, ?max_age, "Request never answered, timing out");
            let _ = pending.reply_tx.send(Err(BrokerError::TimedOut {
                id: pending.target,
                after: max_age,
            }));
        }
        stale.len()
    }
}
