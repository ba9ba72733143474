//! In-process message broker
//!
//! The Broker routes messages between registered peers with three primitives:
//! - **Broadcast:** Pattern-matched fan-out, best effort
//! - **Send:** Targeted request with a correlation-tracked reply, or a heartbeat
//! - **Response:** Answer a previously delivered request
//!
//! Peers that stop heartbeating are evicted by a background sweeper.

mod config;
mod core;
mod error;
mod message;
mod peer;
mod pending;
mod registry;
mod sweeper;

pub use config::BrokerConfig;
pub use core::{Broker, BrokerMetrics};
pub use error::BrokerError;
pub use message::{Message, Reply};
pub use peer::{Mailbox, Peer};
pub use registry::PeerRegistry;
