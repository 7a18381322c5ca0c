//! Control messages posted by the page to the cache router.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured message with a `type` field.
///
/// Only `CLEAR_CACHE` is recognized; everything else (including payloads
/// that are not objects or carry no `type`) parses as `Unknown` and is
/// ignored by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Delete every cache store regardless of version tag.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,

    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Interpret an arbitrary message payload.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Unknown)
    }

    /// Parse a JSON message string; malformed input is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str::<Value>(raw)
            .map(|v| Self::from_value(&v))
            .unwrap_or(Self::Unknown)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}
