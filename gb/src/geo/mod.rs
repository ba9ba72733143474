//! Geo services on top of the broker
//!
//! Services simulate a position and answer distance queries; the
//! [`NearestFinder`] fans a query out to all of them and keeps the closest.

mod config;
mod locator;
mod messages;
mod nearest;
mod service;

pub use config::{NearestConfig, ServiceConfig};
pub use locator::{FixedLocator, Locator, RandomLocator};
pub use messages::{GeoBroker, GeoRequest, ServiceDist};
pub use nearest::{NearestFinder, closer};
pub use service::{ServiceHandle, ServiceWorker};
