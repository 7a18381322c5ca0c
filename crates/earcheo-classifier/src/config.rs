//! Classifier configuration types.
//!
//! Routing is data: the allow-list gates which foreign hosts are looked at
//! at all, and an ordered rule table maps markers and hosts to policies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::result::Policy;

/// Cadastral/survey WMS provider.
pub const CUZK_HOST: &str = "cuzk.gov.cz";
/// GIS tile provider.
pub const ARCGIS_HOST: &str = "arcgis.com";
/// Open mapping provider.
pub const OSM_HOST: &str = "openstreetmap.org";
/// Public tile host, always cache-first.
pub const OSM_TILE_HOST: &str = "tile.openstreetmap.org";

/// Same-origin proxy endpoints serving map tiles.
pub const DEFAULT_TILE_MARKERS: &[&str] = &["/api/wms-proxy", "/api/ortofoto-proxy", "/api/history-proxy"];

/// Errors in a route table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("route rule {index} has an empty {what}")]
    EmptyPattern { index: usize, what: &'static str },

    #[error("allow-listed host {index} is empty")]
    EmptyAllowedHost { index: usize },

    #[error("fallback policy must not be 'ignore'")]
    IgnoreFallback,
}

/// What a route rule inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum Matcher {
    /// URL path contains the marker.
    PathContains(String),
    /// Host equals the pattern or is a subdomain of it.
    Host(String),
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub matcher: Matcher,
    pub policy: Policy,
}

impl RouteRule {
    pub fn path_contains(marker: impl Into<String>, policy: Policy) -> Self {
        Self {
            matcher: Matcher::PathContains(marker.into()),
            policy,
        }
    }

    pub fn host(host: impl Into<String>, policy: Policy) -> Self {
        Self {
            matcher: Matcher::Host(host.into()),
            policy,
        }
    }
}

/// Declarative routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    /// Foreign hosts the router may intercept.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Rules evaluated in order after the origin gate; first hit wins.
    #[serde(default)]
    pub rules: Vec<RouteRule>,

    /// Policy when no rule matches.
    #[serde(default = "default_fallback")]
    pub fallback: Policy,
}

fn default_fallback() -> Policy {
    Policy::Asset
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_lists(
            &[CUZK_HOST, ARCGIS_HOST, OSM_HOST],
            &[OSM_TILE_HOST],
            DEFAULT_TILE_MARKERS,
        )
    }
}

impl RouteTable {
    /// An empty table: only same-origin requests, all classified as assets.
    pub fn empty() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            rules: Vec::new(),
            fallback: Policy::Asset,
        }
    }

    /// Build the standard shape: allow-list, tile hosts and tile markers.
    pub fn from_lists<S: AsRef<str>>(allowed_hosts: &[S], tile_hosts: &[S], tile_markers: &[S]) -> Self {
        let mut rules: Vec<RouteRule> = tile_markers
            .iter()
            .map(|m| RouteRule::path_contains(m.as_ref(), Policy::Tile))
            .collect();
        rules.extend(tile_hosts.iter().map(|h| RouteRule::host(h.as_ref(), Policy::Tile)));

        Self {
            allowed_hosts: allowed_hosts.iter().map(|h| h.as_ref().to_string()).collect(),
            rules,
            fallback: Policy::Asset,
        }
    }

    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    pub fn with_rule(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Markers of all path rules routing to `policy`.
    pub fn markers_for(&self, policy: Policy) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.policy == policy)
            .filter_map(|r| match &r.matcher {
                Matcher::PathContains(m) => Some(m.as_str()),
                Matcher::Host(_) => None,
            })
            .collect()
    }

    /// Hosts of all host rules routing to `policy`.
    pub fn hosts_for(&self, policy: Policy) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.policy == policy)
            .filter_map(|r| match &r.matcher {
                Matcher::Host(h) => Some(h.as_str()),
                Matcher::PathContains(_) => None,
            })
            .collect()
    }

    /// Reject patterns that would match everything.
    pub fn validate(&self) -> Result<(), TableError> {
        if let Some(index) = self.allowed_hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(TableError::EmptyAllowedHost { index });
        }
        for (index, rule) in self.rules.iter().enumerate() {
            let (pattern, what) = match &rule.matcher {
                Matcher::PathContains(m) => (m, "path marker"),
                Matcher::Host(h) => (h, "host"),
            };
            if pattern.trim().is_empty() {
                return Err(TableError::EmptyPattern { index, what });
            }
        }
        if self.fallback == Policy::Ignore {
            return Err(TableError::IgnoreFallback);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = RouteTable::default();
        assert_eq!(table.allowed_hosts, vec!["cuzk.gov.cz", "arcgis.com", "openstreetmap.org"]);
        assert_eq!(
            table.markers_for(Policy::Tile),
            vec!["/api/wms-proxy", "/api/ortofoto-proxy", "/api/history-proxy"]
        );
        assert_eq!(table.hosts_for(Policy::Tile), vec!["tile.openstreetmap.org"]);
        assert_eq!(table.fallback, Policy::Asset);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let table = RouteTable::empty().with_rule(RouteRule::path_contains("  ", Policy::Tile));
        assert_eq!(
            table.validate(),
            Err(TableError::EmptyPattern { index: 0, what: "path marker" })
        );
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let table = RouteTable::empty().allow_host("");
        assert_eq!(table.validate(), Err(TableError::EmptyAllowedHost { index: 0 }));
    }

    #[test]
    fn test_validate_rejects_ignore_fallback() {
        let mut table = RouteTable::empty();
        table.fallback = Policy::Ignore;
        assert_eq!(table.validate(), Err(TableError::IgnoreFallback));
    }

    #[test]
    fn test_table_serialization() {
        let table = RouteTable::default();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains(r#"{"kind":"path_contains","pattern":"/api/wms-proxy"}"#));
        let parsed: RouteTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_fallback_defaults_when_missing() {
        let parsed: RouteTable = serde_json::from_str(r#"{"allowed_hosts":["example.org"]}"#).unwrap();
        assert_eq!(parsed.fallback, Policy::Asset);
        assert!(parsed.rules.is_empty());
    }
}
