//! Outgoing resource requests.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;
use crate::CACHEABLE_METHOD;

/// A resource request issued by the page.
///
/// The URL is kept absolute; relative paths are resolved against the page
/// origin before a request is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method, upper-case.
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers forwarded to the network.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// A GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(CACHEABLE_METHOD, url)
    }

    /// Resolve `path` against `base` and build a GET request.
    pub fn resolve(base: &Url, path: &str) -> Result<Self, FetchError> {
        let url = base
            .join(path)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))?;
        Ok(Self::get(url.to_string()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Parse the request URL.
    pub fn parsed_url(&self) -> Result<Url, FetchError> {
        Url::parse(&self.url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let base = Url::parse("https://earcheo.cz").unwrap();
        let req = Request::resolve(&base, "/favicon.svg").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://earcheo.cz/favicon.svg");
    }

    #[test]
    fn test_resolve_root() {
        let base = Url::parse("https://earcheo.cz/").unwrap();
        let req = Request::resolve(&base, "/").unwrap();
        assert_eq!(req.url, "https://earcheo.cz/");
    }

    #[test]
    fn test_parsed_url_rejects_garbage() {
        let req = Request::get("not a url");
        assert!(matches!(req.parsed_url(), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_headers_skipped_when_empty() {
        let json = serde_json::to_string(&Request::get("https://earcheo.cz/")).unwrap();
        assert!(!json.contains("headers"));

        let with = Request::get("https://earcheo.cz/").with_header("Accept", "image/png");
        let json = serde_json::to_string(&with).unwrap();
        assert!(json.contains("image/png"));
    }
}
