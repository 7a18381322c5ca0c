//! Scripted in-process network.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use earcheo_protocol::{FetchError, Request, Response};

use crate::fetch::Fetcher;

#[derive(Debug, Clone)]
enum Route {
    Respond(Response),
    Fail(FetchError),
    Stall,
}

#[derive(Debug, Default)]
struct NetworkState {
    routes: HashMap<String, Route>,
    offline: bool,
    requests: Vec<Request>,
}

/// A network that answers from a table of URLs and counts every fetch.
///
/// Unrouted URLs get a `404 Not Found`. Going offline makes every fetch
/// fail with a connection error.
#[derive(Debug, Default)]
pub struct MockNetwork {
    state: Mutex<NetworkState>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn serve(&self, url: impl Into<String>, response: Response) -> &Self {
        self.lock().routes.insert(url.into(), Route::Respond(response));
        self
    }

    /// Answer `url` with a `200 OK` carrying `body`.
    pub fn serve_ok(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &Self {
        self.serve(url, Response::ok(body))
    }

    /// Make fetches of `url` reject with `error`.
    pub fn fail(&self, url: impl Into<String>, error: FetchError) -> &Self {
        self.lock().routes.insert(url.into(), Route::Fail(error));
        self
    }

    /// Never answer fetches of `url`.
    pub fn stall(&self, url: impl Into<String>) -> &Self {
        self.lock().routes.insert(url.into(), Route::Stall);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Total fetches seen, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn fetch_count_for(&self, url: &str) -> usize {
        self.lock().requests.iter().filter(|r| r.url == url).count()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The scripted answer, `None` for a stalled URL.
    fn answer(&self, request: &Request) -> Option<Result<Response, FetchError>> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if state.offline {
            return Some(Err(FetchError::Connect(format!("network offline: {}", request.url))));
        }

        match state.routes.get(&request.url) {
            Some(Route::Respond(response)) => Some(Ok(response.clone())),
            Some(Route::Fail(error)) => Some(Err(error.clone())),
            Some(Route::Stall) => None,
            None => Some(Ok(Response::new(404, Vec::new()).with_status_text("Not Found"))),
        }
    }
}

impl Fetcher for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        match self.answer(request) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routed_and_unrouted() {
        let network = MockNetwork::new();
        network.serve_ok("https://earcheo.cz/index.html", "<html>");

        let hit = network.fetch(&Request::get("https://earcheo.cz/index.html")).await.unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, b"<html>");

        let miss = network.fetch(&Request::get("https://earcheo.cz/missing")).await.unwrap();
        assert_eq!(miss.status, 404);

        assert_eq!(network.fetch_count(), 2);
        assert_eq!(network.fetch_count_for("https://earcheo.cz/index.html"), 1);
    }

    #[tokio::test]
    async fn test_offline_and_failures() {
        let network = MockNetwork::new();
        network.serve_ok("https://earcheo.cz/", "home");
        network.fail("https://earcheo.cz/slow", FetchError::Timeout("30s".to_string()));

        let err = network.fetch(&Request::get("https://earcheo.cz/slow")).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));

        network.set_offline(true);
        let err = network.fetch(&Request::get("https://earcheo.cz/")).await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)));

        network.set_offline(false);
        assert!(network.fetch(&Request::get("https://earcheo.cz/")).await.is_ok());
        assert_eq!(network.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_stalled_url_never_answers() {
        let network = MockNetwork::new();
        network.stall("https://earcheo.cz/hang");

        let request = Request::get("https://earcheo.cz/hang");
        let result = tokio::time::timeout(std::time::Duration::from_millis(10), network.fetch(&request)).await;
        assert!(result.is_err());
        assert_eq!(network.fetch_count(), 1);
    }
}
