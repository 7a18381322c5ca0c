//! Typed settings decoded from the merged configuration.

use std::path::PathBuf;
use std::time::Duration;

use earcheo_classifier::{Origin, RouteTable};
use serde::{Deserialize, Serialize};
use url::Url;

use super::defaults::BuiltinDefaults;
use super::effective::ConfigError;

/// Immutable router configuration.
///
/// Everything the router used to take from ambient globals: the page
/// origin, both cache generations, the routing table and the warm-up list.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Origin of the page the router serves.
    pub origin: Url,
    /// Generation of the application asset store.
    pub asset_version_tag: String,
    /// Generation of the map tile store.
    pub tile_version_tag: String,
    /// Allow-list and tile rules.
    pub routes: RouteTable,
    /// Paths pre-fetched into the asset store on install.
    pub warmup: Vec<String>,
}

impl RouterConfig {
    /// Built-in configuration for `origin`.
    pub fn for_origin(origin: &str) -> Result<Self, ConfigError> {
        let defaults = BuiltinDefaults::default();
        let config = Self {
            origin: parse_origin(origin)?,
            asset_version_tag: defaults.asset_version,
            tile_version_tag: defaults.tile_version,
            routes: RouteTable::from_lists(&defaults.allowed_hosts, &defaults.tile_hosts, &defaults.tile_markers),
            warmup: defaults.warmup,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_versions(mut self, asset: impl Into<String>, tile: impl Into<String>) -> Self {
        self.asset_version_tag = asset.into();
        self.tile_version_tag = tile.into();
        self
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_warmup<S: Into<String>>(mut self, warmup: impl IntoIterator<Item = S>) -> Self {
        self.warmup = warmup.into_iter().map(Into::into).collect();
        self
    }

    /// The page origin in classifier form.
    pub fn page_origin(&self) -> Result<Origin, ConfigError> {
        Origin::of(&self.origin)
            .ok_or_else(|| ConfigError::ValidationError(format!("origin {} has no host", self.origin)))
    }

    /// Both current generations, asset first.
    pub fn current_tags(&self) -> [&str; 2] {
        [self.asset_version_tag.as_str(), self.tile_version_tag.as_str()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.asset_version_tag.trim().is_empty() || self.tile_version_tag.trim().is_empty() {
            return Err(ConfigError::ValidationError("cache version tags must not be empty".to_string()));
        }
        if self.asset_version_tag == self.tile_version_tag {
            return Err(ConfigError::ValidationError(format!(
                "asset and tile version tags must differ (both '{}')",
                self.asset_version_tag
            )));
        }
        self.page_origin()?;
        if let Some(path) = self.warmup.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!("invalid warm-up path '{}'", path)));
        }
        self.routes
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("routes: {}", e)))
    }
}

/// Network fetcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

/// Everything the CLI needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub router: RouterConfig,
    pub network: NetworkConfig,
    /// Explicit cache directory, if configured.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SettingsDocument {
    origin: String,
    cache: CacheSection,
    routes: RoutesSection,
    network: NetworkSection,
}

#[derive(Debug, Deserialize, Serialize)]
struct CacheSection {
    asset_version: String,
    tile_version: String,
    warmup: Vec<String>,
    #[serde(default)]
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RoutesSection {
    allowed_hosts: Vec<String>,
    tile_hosts: Vec<String>,
    tile_markers: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct NetworkSection {
    timeout_seconds: u64,
    user_agent: String,
}

impl Settings {
    /// Decode and validate a merged configuration value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let doc: SettingsDocument = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::ParseError(format!("invalid configuration: {}", e)))?;

        if doc.network.timeout_seconds == 0 || doc.network.timeout_seconds > 300 {
            return Err(ConfigError::ValidationError(
                "network.timeout_seconds must be in (0, 300]".to_string(),
            ));
        }

        let router = RouterConfig {
            origin: parse_origin(&doc.origin)?,
            asset_version_tag: doc.cache.asset_version,
            tile_version_tag: doc.cache.tile_version,
            routes: RouteTable::from_lists(&doc.routes.allowed_hosts, &doc.routes.tile_hosts, &doc.routes.tile_markers),
            warmup: doc.cache.warmup,
        };
        router.validate()?;

        Ok(Self {
            router,
            network: NetworkConfig {
                timeout: Duration::from_secs(doc.network.timeout_seconds),
                user_agent: doc.network.user_agent,
            },
            cache_dir: doc.cache.dir,
        })
    }
}

fn parse_origin(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::ValidationError(format!("invalid origin '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "origin '{}' must use http or https",
            raw
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use earcheo_classifier::Policy;

    #[test]
    fn test_for_origin_uses_builtin_tables() {
        let config = RouterConfig::for_origin("https://earcheo.cz").unwrap();
        assert_eq!(config.current_tags(), ["earcheo-v1.1", "earcheo-map-tiles-v1"]);
        assert_eq!(config.routes.hosts_for(Policy::Tile), vec!["tile.openstreetmap.org"]);
        assert_eq!(config.warmup.len(), 3);
    }

    #[test]
    fn test_equal_tags_rejected() {
        let config = RouterConfig::for_origin("https://earcheo.cz")
            .unwrap()
            .with_versions("same", "same");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_empty_tag_rejected() {
        let config = RouterConfig::for_origin("https://earcheo.cz")
            .unwrap()
            .with_versions("", "tiles");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_origin_rejected() {
        assert!(RouterConfig::for_origin("file:///srv/earcheo").is_err());
        assert!(RouterConfig::for_origin("earcheo.cz").is_err());
    }

    #[test]
    fn test_settings_from_defaults() {
        let settings = Settings::from_value(&BuiltinDefaults::default().to_value()).unwrap();
        assert_eq!(settings.router.origin.as_str(), "https://earcheo.cz/");
        assert_eq!(settings.network.timeout, Duration::from_secs(30));
        assert!(settings.cache_dir.is_none());
    }

    #[test]
    fn test_settings_missing_section() {
        let err = Settings::from_value(&serde_json::json!({"origin": "https://earcheo.cz"})).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_settings_timeout_bounds() {
        let mut value = BuiltinDefaults::default().to_value();
        value["network"]["timeout_seconds"] = serde_json::json!(0);
        let err = Settings::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn test_settings_empty_marker_rejected() {
        let mut value = BuiltinDefaults::default().to_value();
        value["routes"]["tile_markers"] = serde_json::json!(["/api/wms-proxy", ""]);
        let err = Settings::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("routes"));
    }
}
