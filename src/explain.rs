//! Explain command output for the classifier
//!
//! Provides structured JSON and human-readable explanations of routing
//! decisions for diagnostic purposes.

use earcheo_classifier::{Classification, MatchReason, Matcher, Policy, RouteTable};
use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;

/// Explanation output for one routing decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainOutput {
    /// The request URL that was classified
    pub url: String,

    /// Page origin the request was judged against
    pub origin: String,

    pub policy: Policy,

    /// Whether the router would intercept the request
    pub intercepted: bool,

    pub same_origin: bool,

    /// Machine-readable reason code
    pub reason: String,

    /// Store the request would read or write (None for ignored requests)
    pub cache_tag: Option<String>,

    /// The routing table used for classification
    pub effective_routes: EffectiveRoutes,

    /// Human-readable explanation
    pub explanation: String,
}

/// The routing table used for classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveRoutes {
    pub allowed_hosts: Vec<String>,
    pub tile_hosts: Vec<String>,
    pub tile_markers: Vec<String>,
    pub fallback: Policy,
}

impl EffectiveRoutes {
    pub fn from_table(table: &RouteTable) -> Self {
        Self {
            allowed_hosts: table.allowed_hosts.clone(),
            tile_hosts: table.hosts_for(Policy::Tile).into_iter().map(String::from).collect(),
            tile_markers: table.markers_for(Policy::Tile).into_iter().map(String::from).collect(),
            fallback: table.fallback,
        }
    }
}

impl ExplainOutput {
    /// Create an ExplainOutput from a Classification
    pub fn from_classification(url: &str, result: &Classification, config: &RouterConfig) -> Self {
        let cache_tag = match result.policy {
            Policy::Tile => Some(config.tile_version_tag.clone()),
            Policy::Asset => Some(config.asset_version_tag.clone()),
            Policy::Ignore => None,
        };

        Self {
            url: url.to_string(),
            origin: config.origin.origin().ascii_serialization(),
            policy: result.policy,
            intercepted: result.is_intercepted(),
            same_origin: result.same_origin,
            reason: result.reason.to_code(),
            explanation: Self::generate_explanation(url, result, cache_tag.as_deref()),
            cache_tag,
            effective_routes: EffectiveRoutes::from_table(&config.routes),
        }
    }

    fn generate_explanation(url: &str, result: &Classification, cache_tag: Option<&str>) -> String {
        let mut lines = vec![format!("Request: {}", url), String::new()];

        lines.push(format!("Decision: {}", result.policy.as_str().to_uppercase()));
        lines.push(format!("Reason: {}", Self::format_reason(&result.reason)));

        match (result.policy, cache_tag) {
            (Policy::Tile, Some(tag)) => lines.push(format!("Strategy: cache-first in '{}'", tag)),
            (Policy::Asset, Some(tag)) => {
                lines.push(format!("Strategy: network-first, refreshing '{}'", tag))
            }
            _ => lines.push("Strategy: not intercepted".to_string()),
        }

        lines.join("\n")
    }

    /// Format a match reason for human reading
    fn format_reason(reason: &MatchReason) -> String {
        match reason {
            MatchReason::InvalidUrl(e) => format!("URL could not be parsed ({})", e),
            MatchReason::ForeignOrigin(h) if h.is_empty() => "URL has no host".to_string(),
            MatchReason::ForeignOrigin(h) => {
                format!("Host '{}' is cross-origin and not allow-listed", h)
            }
            MatchReason::PathMarker(m) => format!("Path contains tile marker '{}'", m),
            MatchReason::HostRule(h) => format!("Host matches tile host '{}'", h),
            MatchReason::Fallback => "No routing rule matched".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as human-readable text
    pub fn to_human(&self) -> String {
        let mut output = self.explanation.clone();
        output.push_str("\n\n--- Effective Routes ---\n");
        output.push_str(&format!("Origin: {}\n", self.origin));

        let routes = &self.effective_routes;
        output.push_str(&format!("Allowed hosts: {}\n", routes.allowed_hosts.join(", ")));
        output.push_str(&format!("Tile hosts: {}\n", routes.tile_hosts.join(", ")));
        output.push_str(&format!("Tile markers: {}\n", routes.tile_markers.join(", ")));
        output.push_str(&format!("Fallback: {}\n", routes.fallback));

        output
    }
}

/// Human-readable one-line form of a rule matcher.
pub fn describe_matcher(matcher: &Matcher) -> String {
    match matcher {
        Matcher::PathContains(marker) => format!("path contains '{}'", marker),
        Matcher::Host(host) => format!("host is '{}' or a subdomain", host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earcheo_classifier::Classifier;

    fn explain(url: &str) -> ExplainOutput {
        let config = RouterConfig::for_origin("https://earcheo.cz").unwrap();
        let classifier = Classifier::new(config.page_origin().unwrap(), config.routes.clone());
        ExplainOutput::from_classification(url, &classifier.classify(url), &config)
    }

    #[test]
    fn test_explain_tile_marker() {
        let out = explain("https://earcheo.cz/api/wms-proxy?layer=cadastre");

        assert_eq!(out.policy, Policy::Tile);
        assert!(out.intercepted);
        assert_eq!(out.cache_tag.as_deref(), Some("earcheo-map-tiles-v1"));
        assert_eq!(out.reason, "PATH_MARKER:/api/wms-proxy");
        assert!(out.explanation.contains("cache-first"));
    }

    #[test]
    fn test_explain_ignored() {
        let out = explain("https://fonts.googleapis.com/css2?family=Inter");

        assert_eq!(out.policy, Policy::Ignore);
        assert!(!out.intercepted);
        assert!(out.cache_tag.is_none());
        assert!(out.explanation.contains("not allow-listed"));
    }

    #[test]
    fn test_explain_to_json() {
        let json = explain("https://earcheo.cz/index.html").to_json().unwrap();
        assert!(json.contains("\"policy\": \"asset\""));
        assert!(json.contains("\"origin\": \"https://earcheo.cz\""));
    }

    #[test]
    fn test_explain_to_human() {
        let human = explain("https://tile.openstreetmap.org/3/4/2.png").to_human();
        assert!(human.contains("Decision: TILE"));
        assert!(human.contains("Effective Routes"));
        assert!(human.contains("Tile hosts: tile.openstreetmap.org"));
    }

    #[test]
    fn test_describe_matcher() {
        assert_eq!(
            describe_matcher(&Matcher::Host("arcgis.com".to_string())),
            "host is 'arcgis.com' or a subdomain"
        );
    }
}
