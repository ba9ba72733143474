//! Geo service worker
//!
//! A worker registers under its own name, answers distance requests on its
//! mailbox and heartbeats the broker so it is not evicted.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::locator::Locator;
use super::messages::{GeoBroker, GeoRequest, ServiceDist};
use crate::broker::{Mailbox, Message};

/// A geo service that has not been started yet
pub struct ServiceWorker {
    name: String,
    broker: GeoBroker,
    locator: Box<dyn Locator>,
    heartbeat_interval: Duration,
}

impl ServiceWorker {
    /// Create a worker with a generated `geo-<uuid>` name
    pub fn new(broker: GeoBroker, locator: impl Locator, heartbeat_interval: Duration) -> Self {
        Self::with_name(format!("geo-{}", Uuid::now_v7()), broker, locator, heartbeat_interval)
    }

    pub fn with_name(
        name: impl Into<String>,
        broker: GeoBroker,
        locator: impl Locator,
        heartbeat_interval: Duration,
    ) -> Self {
        let name = name.into();
        debug!(%name, ?heartbeat_interval, "ServiceWorker::with_name: called");
        Self {
            name,
            broker,
            locator: Box::new(locator),
            heartbeat_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register with the broker and spawn the serve and heartbeat loops
    ///
    /// Registration completes before this returns, so the service is
    /// addressable as soon as the handle exists.
    pub async fn start(self) -> ServiceHandle {
        debug!(name = %self.name, "ServiceWorker::start: called");
        let mailbox = self.broker.register(&self.name).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (x, y) = self.locator.coordinates();
        info!(service = %self.name, x, y, "Service is up");

        let heartbeat = tokio::spawn(heartbeat_loop(
            self.name.clone(),
            self.broker.clone(),
            self.heartbeat_interval,
            shutdown_rx.clone(),
        ));
        let serve = tokio::spawn(serve_loop(self.name.clone(), self.broker, self.locator, mailbox, shutdown_rx));

        ServiceHandle {
            name: self.name,
            shutdown_tx,
            serve,
            heartbeat,
        }
    }
}

/// Handle to a running geo service
pub struct ServiceHandle {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    serve: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop both loops and wait until they have exited
    ///
    /// After this returns the service neither mutates its position nor
    /// talks to the broker.
    pub async fn stop(self) {
        debug!(name = %self.name, "ServiceHandle::stop: called");
        let _ = self.shutdown_tx.send(true);
        for (loop_name, task) in [("serve", self.serve), ("heartbeat", self.heartbeat)] {
            if let Err(e) = task.await {
                warn!(service = %self.name, %loop_name, error = %e, "Service loop ended abnormally");
            }
        }
        info!(service = %self.name, "Service stopped");
    }
}

async fn serve_loop(
    name: String,
    broker: GeoBroker,
    mut locator: Box<dyn Locator>,
    mut mailbox: Mailbox<Value>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            msg = mailbox.recv() => match msg {
                Some(msg) => process(&name, &broker, locator.as_mut(), msg).await,
                None => {
                    info!(service = %name, "Mailbox closed, registering again");
                    mailbox = broker.register(&name).await;
                }
            },
        }
    }
    debug!(service = %name, "serve_loop: exited");
}

async fn heartbeat_loop(name: String, broker: GeoBroker, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let reply_rx = broker.send("", Message::heartbeat(name.as_str())).await;
                if let Ok(Err(e)) = reply_rx.await {
                    debug!(service = %name, error = %e, "Heartbeat not accepted");
                }
            }
        }
    }
    debug!(service = %name, "heartbeat_loop: exited");
}

async fn process(name: &str, broker: &GeoBroker, locator: &mut dyn Locator, msg: Message<Value>) {
    let Some(request) = msg.body.as_ref().and_then(GeoRequest::decode) else {
        debug!(service = %name, sender = %msg.sender, "Ignoring unrecognized message");
        return;
    };

    match request {
        GeoRequest::UpdatePosition => {
            locator.update();
            let (x, y) = locator.coordinates();
            info!(service = %name, x, y, "Service updated location");
        }
        GeoRequest::GetDistance { x, y } => {
            let Some(correlation_id) = msg.correlation_id else {
                debug!(service = %name, "Distance request without correlation id, ignored");
                return;
            };
            let dist = ServiceDist {
                service: name.to_string(),
                dist: locator.distance(x, y),
            };
            match dist.to_body() {
                Ok(body) => broker.response(&correlation_id, Message::new(name, body)).await,
                Err(e) => warn!(service = %name, error = %e, "Failed to encode distance"),
            }
        }
    }
}
