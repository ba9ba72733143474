//! Interactive command surface for GeoBroker
//!
//! Turns typed commands into broker calls: nearest-service lookups,
//! position-update broadcasts and service listings.

mod command;
mod session;

pub use command::{ReplCommand, parse_point};
pub use session::ReplSession;

use eyre::Result;

use crate::config::Config;
use crate::geo::{GeoBroker, NearestFinder};

/// Run the interactive REPL against `broker`
pub async fn run_interactive(config: &Config, broker: GeoBroker) -> Result<()> {
    let finder = NearestFinder::new(broker.clone(), &config.nearest)?;
    let mut session = ReplSession::new(broker, finder, config.service.routing_key.clone());
    session.run().await
}
