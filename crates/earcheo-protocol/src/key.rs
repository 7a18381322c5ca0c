//! Cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

use crate::request::Request;
use crate::CACHEABLE_METHOD;

/// Normalized identity of a cached request.
///
/// The method is upper-cased and the URL fragment is dropped; the query
/// string is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: strip_fragment(url),
        }
    }

    /// Key for a GET of `url`.
    pub fn get(url: &str) -> Self {
        Self::new(CACHEABLE_METHOD, url)
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(&request.method, &request.url)
    }

    /// Whether a response for this key may be written to a store.
    pub fn is_storable(&self) -> bool {
        self.method == CACHEABLE_METHOD
    }

    /// SHA-256 hex digest of the key, used as the on-disk entry name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

fn strip_fragment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => match raw.split_once('#') {
            Some((head, _)) => head.to_string(),
            None => raw.to_string(),
        },
    }
}
