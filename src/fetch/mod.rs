//! Network fetch abstraction.
//!
//! The router never talks to the network directly; it goes through a
//! [`Fetcher`] so tests can script the network and the CLI can use a real
//! HTTP client.

mod http;

use std::future::Future;
use std::sync::Arc;

use earcheo_protocol::{FetchError, Request, Response};

pub use http::ReqwestFetcher;

/// Performs network fetches on behalf of the router.
///
/// Any HTTP status is a successful fetch. Only transport failures
/// (connection refused, timeout, truncated body) are errors.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, FetchError>> + Send;
}

impl<T: Fetcher> Fetcher for Arc<T> {
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, FetchError>> + Send {
        (**self).fetch(request)
    }
}
