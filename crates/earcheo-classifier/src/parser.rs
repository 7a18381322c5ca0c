//! Request target parsing.
//!
//! Splits a request URL into the parts the classifier inspects. Pure string
//! work, no I/O.

use url::Url;

/// Scheme, host and effective port of a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    /// Parse an origin such as `https://earcheo.cz` or `http://localhost:5173`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| format!("invalid origin '{}': {}", raw, e))?;
        Self::of(&url).ok_or_else(|| format!("origin '{}' has no host", raw))
    }

    /// Origin of a parsed URL, `None` for host-less URLs (data:, blob:).
    pub fn of(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        Some(Self {
            scheme: url.scheme().to_string(),
            host: host.to_ascii_lowercase(),
            port: url.port_or_known_default(),
        })
    }

    /// Serialized `scheme://host[:port]`, omitting default ports.
    pub fn to_url_string(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        match self.port {
            Some(p) if Some(p) != default_port => format!("{}://{}:{}", self.scheme, self.host, p),
            _ => format!("{}://{}", self.scheme, self.host),
        }
    }
}

/// The classifier's view of a request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Origin, `None` when the URL has no host.
    pub origin: Option<Origin>,
    /// URL path without query or fragment.
    pub path: String,
}

impl RequestTarget {
    pub fn host(&self) -> Option<&str> {
        self.origin.as_ref().map(|o| o.host.as_str())
    }
}

/// Parse a request URL into a `RequestTarget`.
pub fn parse_target(raw: &str) -> Result<RequestTarget, String> {
    let url = Url::parse(raw).map_err(|e| format!("{}: {}", raw, e))?;
    Ok(RequestTarget {
        origin: Origin::of(&url),
        path: url.path().to_string(),
    })
}

/// Whether `host` is `pattern` or a subdomain of it.
pub fn host_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    host == pattern
        || (host.len() > pattern.len()
            && host.ends_with(&pattern)
            && host.as_bytes()[host.len() - pattern.len() - 1] == b'.')
}
