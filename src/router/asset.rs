//! Network-first policy for application assets.

use earcheo_classifier::Policy;
use earcheo_protocol::{CacheKey, Request};
use earcheo_store::CacheStorage;
use tracing::{debug, info, warn};

use super::error::RouterError;
use super::outcome::{FetchOutcome, ResponseSource};
use crate::fetch::Fetcher;

/// Fetch `request` live, refreshing the asset store `tag` on a `200`.
///
/// If the network rejects, any stored copy of the same key is served,
/// searching every store oldest first. With no copy the network error
/// is returned.
pub async fn network_first<S, F>(
    storage: &S,
    fetcher: &F,
    tag: &str,
    request: &Request,
) -> Result<FetchOutcome, RouterError>
where
    S: CacheStorage,
    F: Fetcher,
{
    let key = CacheKey::from_request(request);

    let err = match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_cacheable() && key.is_storable() {
                match storage.put(tag, &key, &response).await {
                    Ok(()) => debug!(url = %request.url, tag, "[asset] cache refreshed"),
                    Err(e) => warn!(url = %request.url, tag, error = %e, "[asset] failed to store response"),
                }
            }
            return Ok(FetchOutcome::respond(response, ResponseSource::Network, Policy::Asset));
        }
        Err(e) => e,
    };

    match storage.match_any(&key).await? {
        Some(entry) => {
            info!(url = %request.url, error = %err, "[asset] network failed, serving cached copy");
            Ok(FetchOutcome::respond(entry.response, ResponseSource::Cache, Policy::Asset))
        }
        None => {
            warn!(url = %request.url, error = %err, "[asset] network failed, nothing cached");
            Err(RouterError::Network(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FlakyStorage, MockNetwork, StoreOp};
    use earcheo_protocol::{FetchError, Response};
    use earcheo_store::MemoryStorage;

    const TAG: &str = "earcheo-v1.1";
    const INDEX: &str = "https://earcheo.cz/index.html";

    #[tokio::test]
    async fn test_success_refreshes_cache() {
        let storage = MemoryStorage::new();
        let network = MockNetwork::new();
        network.serve_ok(INDEX, "v2");
        storage.put(TAG, &CacheKey::get(INDEX), &Response::ok("v1")).await.unwrap();

        let outcome = network_first(&storage, &network, TAG, &Request::get(INDEX)).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap().body, b"v2");

        let stored = storage.match_in(TAG, &CacheKey::get(INDEX)).await.unwrap().unwrap();
        assert_eq!(stored.response.body, b"v2");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_any_store() {
        let storage = MemoryStorage::new();
        storage.put("earcheo-v1.0", &CacheKey::get(INDEX), &Response::ok("old")).await.unwrap();
        let network = MockNetwork::new();
        network.set_offline(true);

        let outcome = network_first(&storage, &network, TAG, &Request::get(INDEX)).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, b"old");
    }

    #[tokio::test]
    async fn test_failure_without_copy_surfaces_network_error() {
        let storage = MemoryStorage::new();
        let network = MockNetwork::new();
        network.fail(INDEX, FetchError::Timeout("30s".to_string()));

        let err = network_first(&storage, &network, TAG, &Request::get(INDEX)).await.unwrap_err();
        assert!(matches!(err, RouterError::Network(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_error_status_returned_not_stored() {
        let storage = MemoryStorage::new();
        let network = MockNetwork::new();
        network.serve(INDEX, Response::new(500, "boom").with_status_text("Internal Server Error"));

        let outcome = network_first(&storage, &network, TAG, &Request::get(INDEX)).await.unwrap();
        assert_eq!(outcome.response().unwrap().status, 500);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_failure_is_not_fatal() {
        let storage = FlakyStorage::new(MemoryStorage::new());
        storage.fail(StoreOp::Put, "quota exceeded");
        let network = MockNetwork::new();
        network.serve_ok(INDEX, "fresh");

        let outcome = network_first(&storage, &network, TAG, &Request::get(INDEX)).await.unwrap();
        assert_eq!(outcome.response().unwrap().body, b"fresh");
    }

    #[tokio::test]
    async fn test_post_never_stored() {
        let storage = MemoryStorage::new();
        let network = MockNetwork::new();
        network.serve_ok("https://earcheo.cz/api/findings", "{}");

        let request = Request::new("POST", "https://earcheo.cz/api/findings");
        network_first(&storage, &network, TAG, &request).await.unwrap();
        assert!(storage.is_empty().await);
    }
}
