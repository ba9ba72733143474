//! Request and result payloads exchanged with geo services

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::Broker;

/// Broker carrying JSON bodies, decoded at the geo boundary
pub type GeoBroker = Broker<Value>;

/// Requests understood by a geo service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum GeoRequest {
    /// Move to a new position
    UpdatePosition,

    /// Report the distance from the current position to (x, y)
    GetDistance { x: f64, y: f64 },
}

impl GeoRequest {
    /// Decode a message body; anything that is not a request yields None
    pub fn decode(body: &Value) -> Option<Self> {
        Self::deserialize(body).ok()
    }

    pub fn to_body(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Distance reported by one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDist {
    pub service: String,
    pub dist: f64,
}

impl ServiceDist {
    pub fn decode(body: &Value) -> serde_json::Result<Self> {
        Self::deserialize(body)
    }

    pub fn to_body(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
