//! Scatter-gather lookup of the service nearest to a point
//!
//! Service names are fed through a shared work queue to a fixed pool of
//! senders. Each sender asks one service at a time for its distance and
//! forwards decoded answers to a single reducer that keeps the minimum.
//! Failed services are logged and skipped.
//!
//! Ties go to the first minimal answer the reducer sees. Arrival order
//! depends on scheduling, so ties are not deterministic across runs.

use std::sync::Arc;

use eyre::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::NearestConfig;
use super::messages::{GeoBroker, GeoRequest, ServiceDist};
use crate::broker::Message;

/// Issues nearest-service queries on behalf of one caller
pub struct NearestFinder {
    broker: GeoBroker,
    name: String,
    pool_size: usize,
    routing_key: Option<Regex>,
}

impl NearestFinder {
    pub fn new(broker: GeoBroker, config: &NearestConfig) -> Result<Self> {
        let routing_key = if config.routing_key.is_empty() {
            None
        } else {
            Some(Regex::new(&config.routing_key).context("Invalid nearest routing-key")?)
        };
        let name = format!("cli-{}", Uuid::now_v7());
        debug!(%name, pool_size = config.pool_size, "NearestFinder::new: called");
        Ok(Self {
            broker,
            name,
            pool_size: config.pool_size.max(1),
            routing_key,
        })
    }

    /// Sender name stamped on outgoing requests
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the registered service closest to (x, y)
    ///
    /// Returns `Ok(None)` when no service answered.
    pub async fn closest(&self, x: f64, y: f64) -> Result<Option<ServiceDist>> {
        debug!(x, y, "NearestFinder::closest: called");
        let services: Vec<String> = self
            .broker
            .get_services()
            .await
            .into_iter()
            .filter(|s| self.routing_key.as_ref().is_none_or(|exp| exp.is_match(s)))
            .collect();
        if services.is_empty() {
            info!("No services registered, no candidate");
            return Ok(None);
        }

        let body = GeoRequest::GetDistance { x, y }
            .to_body()
            .context("Failed to encode distance request")?;
        let request = Message::new(self.name.as_str(), body);

        // Work queue is pre-filled and closed; senders drain it until empty
        let (work_tx, work_rx) = mpsc::channel(services.len());
        for service in &services {
            work_tx
                .send(service.clone())
                .await
                .map_err(|_| eyre::eyre!("Work queue closed"))?;
        }
        drop(work_tx);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let (result_tx, mut result_rx) = mpsc::channel::<ServiceDist>(services.len());
        let reducer = tokio::spawn(async move {
            let mut best = None;
            while let Some(candidate) = result_rx.recv().await {
                best = closer(best, candidate);
            }
            best
        });

        let senders: Vec<_> = (0..self.pool_size.min(services.len()))
            .map(|_| {
                tokio::spawn(query_worker(
                    self.broker.clone(),
                    request.clone(),
                    work_rx.clone(),
                    result_tx.clone(),
                ))
            })
            .collect();
        drop(result_tx);

        for sender in senders {
            if let Err(e) = sender.await {
                warn!(error = %e, "Distance sender ended abnormally");
            }
        }
        let best = reducer.await.context("Reducer task failed")?;

        match &best {
            Some(found) => info!(service = %found.service, dist = found.dist, "Nearest service found"),
            None => info!(queried = services.len(), "No service answered, no candidate"),
        }
        Ok(best)
    }
}

async fn query_worker(
    broker: GeoBroker,
    request: Message<Value>,
    work_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    result_tx: mpsc::Sender<ServiceDist>,
) {
    loop {
        let next = work_rx.lock().await.recv().await;
        let Some(service) = next else {
            break;
        };

        let reply = match broker.send(&service, request.clone()).await.await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(%service, "Reply channel dropped without an answer");
                continue;
            }
        };

        let body = match reply {
            Ok(Some(body)) => body,
            Ok(None) => {
                warn!(%service, "Empty reply to distance request");
                continue;
            }
            Err(e) => {
                warn!(%service, error = %e, "Distance request failed");
                continue;
            }
        };

        match ServiceDist::decode(&body) {
            Ok(dist) => {
                if result_tx.send(dist).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(%service, error = %e, %body, "Failed to decode distance reply"),
        }
    }
}

/// Keep the strictly closer candidate; the incumbent wins ties
pub fn closer(best: Option<ServiceDist>, candidate: ServiceDist) -> Option<ServiceDist> {
    match best {
        Some(best) if best.dist <= candidate.dist => Some(best),
        _ => Some(candidate),
    }
}
