//! Classifier result types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caching policy assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Cache-first, stored under the tile version tag.
    Tile,
    /// Network-first, stored under the asset version tag.
    Asset,
    /// Not intercepted; the host handles the request natively.
    Ignore,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tile => "tile",
            Self::Asset => "asset",
            Self::Ignore => "ignore",
        }
    }
}

/// A policy name that is not `tile`, `asset` or `ignore`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown policy '{0}'")]
pub struct UnknownPolicy(pub String);

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tile" => Ok(Self::Tile),
            "asset" => Ok(Self::Asset),
            "ignore" => Ok(Self::Ignore),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request got its policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum MatchReason {
    /// The URL could not be parsed.
    #[serde(rename = "INVALID_URL")]
    InvalidUrl(String),

    /// Foreign origin whose host is not allow-listed.
    #[serde(rename = "FOREIGN_ORIGIN")]
    ForeignOrigin(String),

    /// Path contained a routing marker.
    #[serde(rename = "PATH_MARKER")]
    PathMarker(String),

    /// Host matched a host rule.
    #[serde(rename = "HOST_RULE")]
    HostRule(String),

    /// No rule matched.
    #[serde(rename = "FALLBACK")]
    Fallback,
}

impl MatchReason {
    /// Get a machine-readable string representation.
    pub fn to_code(&self) -> String {
        match self {
            MatchReason::InvalidUrl(e) => format!("INVALID_URL:{}", e),
            MatchReason::ForeignOrigin(h) => format!("FOREIGN_ORIGIN:{}", h),
            MatchReason::PathMarker(m) => format!("PATH_MARKER:{}", m),
            MatchReason::HostRule(h) => format!("HOST_RULE:{}", h),
            MatchReason::Fallback => "FALLBACK".to_string(),
        }
    }
}

/// Result of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub policy: Policy,
    pub reason: MatchReason,
    /// Whether the target shares the page origin.
    pub same_origin: bool,
}

impl Classification {
    pub fn new(policy: Policy, reason: MatchReason, same_origin: bool) -> Self {
        Self {
            policy,
            reason,
            same_origin,
        }
    }

    /// Not intercepted.
    pub fn ignored(reason: MatchReason) -> Self {
        Self::new(Policy::Ignore, reason, false)
    }

    pub fn is_intercepted(&self) -> bool {
        self.policy != Policy::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trip_str() {
        for policy in [Policy::Tile, Policy::Asset, Policy::Ignore] {
            assert_eq!(policy.as_str().parse::<Policy>(), Ok(policy));
        }
        assert_eq!("TILE".parse::<Policy>(), Ok(Policy::Tile));
        assert_eq!("stale".parse::<Policy>(), Err(UnknownPolicy("stale".to_string())));
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(
            MatchReason::PathMarker("/api/wms-proxy".to_string()).to_code(),
            "PATH_MARKER:/api/wms-proxy"
        );
        assert_eq!(MatchReason::Fallback.to_code(), "FALLBACK");
    }

    #[test]
    fn test_ignored_is_not_intercepted() {
        let c = Classification::ignored(MatchReason::ForeignOrigin("example.com".to_string()));
        assert!(!c.is_intercepted());
        assert!(!c.same_origin);
    }

    #[test]
    fn test_serialization() {
        let c = Classification::new(Policy::Tile, MatchReason::HostRule("tile.openstreetmap.org".to_string()), false);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains(r#""policy":"tile""#));
        assert!(json.contains("HOST_RULE"));
    }
}
