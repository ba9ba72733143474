//! GeoBroker - in-process publish/request broker
//!
//! Independent service workers register with a [`broker::Broker`], receive
//! broadcast or targeted messages, and reply asynchronously. A coordinator
//! fans a distance query out to every service and keeps the closest answer.
//!
//! # Core Concepts
//!
//! - **Liveness**: Peers heartbeat; a background sweeper evicts silent ones
//! - **Correlation**: Every targeted request carries a unique id that pairs it with its reply
//! - **Bounded Delivery**: Every delivery attempt races a fixed timeout
//! - **Scatter-Gather**: A fixed pool of senders queries all services, one reducer keeps the minimum
//!
//! # Modules
//!
//! - [`broker`] - Peer registry, routing, request/reply correlation
//! - [`geo`] - Geo service workers and the nearest-service finder
//! - [`repl`] - Interactive command surface
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod broker;
pub mod cli;
pub mod config;
pub mod geo;
pub mod repl;

// Re-export commonly used types
pub use broker::{Broker, BrokerConfig, BrokerError, BrokerMetrics, Mailbox, Message, Peer, PeerRegistry, Reply};
pub use config::Config;
pub use geo::{
    FixedLocator, GeoBroker, GeoRequest, Locator, NearestConfig, NearestFinder, RandomLocator, ServiceConfig,
    ServiceDist, ServiceHandle, ServiceWorker,
};
