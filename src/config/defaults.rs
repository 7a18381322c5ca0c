//! Built-in router defaults (layer 1)
//!
//! The values the map client ships with: cache generations, warm-up list and
//! the routing tables for the Czech survey/GIS tile providers.

use earcheo_classifier::{ARCGIS_HOST, CUZK_HOST, DEFAULT_TILE_MARKERS, OSM_HOST, OSM_TILE_HOST};
use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Page origin (default: "https://earcheo.cz")
    pub origin: String,

    /// Asset cache generation (default: "earcheo-v1.1")
    pub asset_version: String,

    /// Map tile cache generation (default: "earcheo-map-tiles-v1")
    pub tile_version: String,

    /// Documents pre-fetched on install
    pub warmup: Vec<String>,

    /// Foreign hosts the router may intercept
    pub allowed_hosts: Vec<String>,

    /// Hosts always served cache-first
    pub tile_hosts: Vec<String>,

    /// Path markers of the tile proxies
    pub tile_markers: Vec<String>,

    /// Network request timeout in seconds (default: 30)
    pub timeout_seconds: u64,

    /// User-Agent for network fetches
    pub user_agent: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            origin: "https://earcheo.cz".to_string(),
            asset_version: "earcheo-v1.1".to_string(),
            tile_version: "earcheo-map-tiles-v1".to_string(),
            warmup: vec!["/".to_string(), "/index.html".to_string(), "/favicon.svg".to_string()],
            allowed_hosts: vec![CUZK_HOST.to_string(), ARCGIS_HOST.to_string(), OSM_HOST.to_string()],
            tile_hosts: vec![OSM_TILE_HOST.to_string()],
            tile_markers: DEFAULT_TILE_MARKERS.iter().map(|m| m.to_string()).collect(),
            timeout_seconds: 30,
            user_agent: concat!("earcheo-cache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "origin": self.origin,
            "cache": {
                "asset_version": self.asset_version,
                "tile_version": self.tile_version,
                "warmup": self.warmup
            },
            "routes": {
                "allowed_hosts": self.allowed_hosts,
                "tile_hosts": self.tile_hosts,
                "tile_markers": self.tile_markers
            },
            "network": {
                "timeout_seconds": self.timeout_seconds,
                "user_agent": self.user_agent
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.asset_version, "earcheo-v1.1");
        assert_eq!(defaults.tile_version, "earcheo-map-tiles-v1");
        assert_eq!(defaults.warmup, vec!["/", "/index.html", "/favicon.svg"]);
        assert_eq!(defaults.tile_hosts, vec!["tile.openstreetmap.org"]);
        assert_eq!(defaults.timeout_seconds, 30);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["origin"], "https://earcheo.cz");
        assert_eq!(value["cache"]["tile_version"], "earcheo-map-tiles-v1");
        assert_eq!(value["routes"]["tile_markers"][0], "/api/wms-proxy");
        assert_eq!(value["network"]["timeout_seconds"], 30);
    }
}
