//! Request classifier for the eArcheo cache router.
//!
//! Assigns every outgoing request exactly one policy: `tile` (cache-first),
//! `asset` (network-first) or `ignore` (not intercepted). Classification is
//! pure string inspection and never blocks.

mod config;
mod parser;
mod result;

pub use config::{
    Matcher, RouteRule, RouteTable, TableError, ARCGIS_HOST, CUZK_HOST, DEFAULT_TILE_MARKERS,
    OSM_HOST, OSM_TILE_HOST,
};
pub use parser::{host_matches, parse_target, Origin, RequestTarget};
pub use result::{Classification, MatchReason, Policy, UnknownPolicy};

/// Classifies requests made by a page served from `origin`.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Origin,
    table: RouteTable,
}

impl Classifier {
    pub fn new(origin: Origin, table: RouteTable) -> Self {
        Self { origin, table }
    }

    /// Build from a serialized page origin.
    pub fn for_origin(origin: &str, table: RouteTable) -> Result<Self, String> {
        Ok(Self::new(Origin::parse(origin)?, table))
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Classify a request URL.
    pub fn classify(&self, url: &str) -> Classification {
        classify(url, &self.origin, &self.table)
    }
}

/// Classify `url` as seen from a page on `page_origin`.
///
/// The origin gate runs first: a foreign host must be allow-listed to be
/// considered at all, and an allow-listed host still goes through the rule
/// table rather than being routed to tiles automatically.
pub fn classify(url: &str, page_origin: &Origin, table: &RouteTable) -> Classification {
    let target = match parse_target(url) {
        Ok(t) => t,
        Err(e) => return Classification::ignored(MatchReason::InvalidUrl(e)),
    };

    let host = target.host().unwrap_or_default().to_string();
    let same_origin = target.origin.as_ref() == Some(page_origin);

    if !same_origin && !table.allowed_hosts.iter().any(|h| host_matches(&host, h)) {
        return Classification::ignored(MatchReason::ForeignOrigin(host));
    }

    for rule in &table.rules {
        let reason = match &rule.matcher {
            Matcher::PathContains(marker) if target.path.contains(marker.as_str()) => {
                MatchReason::PathMarker(marker.clone())
            }
            Matcher::Host(pattern) if host_matches(&host, pattern) => MatchReason::HostRule(pattern.clone()),
            _ => continue,
        };
        return Classification::new(rule.policy, reason, same_origin);
    }

    Classification::new(table.fallback, MatchReason::Fallback, same_origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::for_origin("https://earcheo.cz", RouteTable::default()).unwrap()
    }

    #[test]
    fn test_foreign_host_ignored() {
        let c = classifier().classify("https://fonts.googleapis.com/css?family=Inter");
        assert_eq!(c.policy, Policy::Ignore);
        assert_eq!(c.reason, MatchReason::ForeignOrigin("fonts.googleapis.com".to_string()));
    }

    #[test]
    fn test_osm_tile_host_is_tile() {
        let c = classifier().classify("https://tile.openstreetmap.org/12/2200/1390.png");
        assert_eq!(c.policy, Policy::Tile);
        assert_eq!(c.reason, MatchReason::HostRule("tile.openstreetmap.org".to_string()));
        assert!(!c.same_origin);
    }

    #[test]
    fn test_wms_proxy_marker_is_tile() {
        let c = classifier().classify("https://earcheo.cz/api/wms-proxy?layer=cadastre");
        assert_eq!(c.policy, Policy::Tile);
        assert_eq!(c.reason, MatchReason::PathMarker("/api/wms-proxy".to_string()));
        assert!(c.same_origin);
    }

    #[test]
    fn test_index_html_is_asset() {
        let c = classifier().classify("https://earcheo.cz/index.html");
        assert_eq!(c.policy, Policy::Asset);
        assert_eq!(c.reason, MatchReason::Fallback);
    }

    #[test]
    fn test_allow_listed_host_falls_through_to_asset() {
        let c = classifier().classify(
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/5/10/17",
        );
        // arcgisonline.com is not arcgis.com
        assert_eq!(c.policy, Policy::Ignore);

        let c = classifier().classify("https://services.arcgis.com/rest/info");
        assert_eq!(c.policy, Policy::Asset);
    }

    #[test]
    fn test_marker_on_foreign_host_still_gated() {
        let c = classifier().classify("https://evil.example/api/wms-proxy");
        assert_eq!(c.policy, Policy::Ignore);
    }

    #[test]
    fn test_marker_on_allow_listed_host_is_tile() {
        let c = classifier().classify("https://ags.cuzk.gov.cz/api/history-proxy/tile");
        assert_eq!(c.policy, Policy::Tile);
    }

    #[test]
    fn test_different_port_is_foreign() {
        let c = Classifier::for_origin("http://localhost:5173", RouteTable::default()).unwrap();
        assert_eq!(c.classify("http://localhost:5173/index.html").policy, Policy::Asset);
        assert_eq!(c.classify("http://localhost:3000/api/wms-proxy").policy, Policy::Ignore);
    }

    #[test]
    fn test_invalid_url_ignored() {
        let c = classifier().classify("::not a url::");
        assert_eq!(c.policy, Policy::Ignore);
        assert!(matches!(c.reason, MatchReason::InvalidUrl(_)));
    }

    #[test]
    fn test_first_rule_wins() {
        let table = RouteTable::empty()
            .with_rule(RouteRule::path_contains("/api/", Policy::Asset))
            .with_rule(RouteRule::path_contains("/api/wms-proxy", Policy::Tile));
        let c = Classifier::for_origin("https://earcheo.cz", table).unwrap();
        assert_eq!(c.classify("https://earcheo.cz/api/wms-proxy").policy, Policy::Asset);
    }

    #[test]
    fn test_rule_can_ignore_same_origin_paths() {
        let table = RouteTable::default().with_rule(RouteRule::path_contains("/api/findings", Policy::Ignore));
        let c = Classifier::for_origin("https://earcheo.cz", table).unwrap();
        assert_eq!(c.classify("https://earcheo.cz/api/findings/42").policy, Policy::Ignore);
    }
}
