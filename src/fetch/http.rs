//! HTTP fetcher backed by reqwest.

use std::time::Duration;

use earcheo_protocol::{FetchError, Request, Response};
use tracing::{debug, trace, warn};

use super::Fetcher;
use crate::config::NetworkConfig;

/// Real network fetcher.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a fetcher with the configured timeout and user agent.
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        Self::with_timeout(config.timeout, &config.user_agent)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Connect(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.parsed_url()?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidUrl(format!("bad method {}: {}", request.method, e)))?;

        trace!(method = %request.method, url = %url, "HTTP request starting");

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = match builder.send().await {
            Ok(resp) => {
                debug!(url = %url, status = resp.status().as_u16(), "HTTP response received");
                resp
            }
            Err(e) => {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(classify_error(&e));
            }
        };

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = match resp.bytes().await {
            Ok(bytes) => {
                trace!(url = %url, bytes = bytes.len(), "HTTP response body read");
                bytes.to_vec()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to read response body");
                return Err(if e.is_timeout() {
                    FetchError::Timeout(e.to_string())
                } else {
                    FetchError::Body(e.to_string())
                });
            }
        };

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn classify_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else if e.is_builder() {
        FetchError::InvalidUrl(e.to_string())
    } else if e.is_body() || e.is_decode() {
        FetchError::Body(e.to_string())
    } else {
        FetchError::Connect(e.to_string())
    }
}
