//! Cache-first policy for map tiles.
//!
//! Tiles for a given URL never change within a tile generation, so a stored
//! copy is always served without touching the network.

use earcheo_classifier::Policy;
use earcheo_protocol::{CacheKey, Request};
use earcheo_store::CacheStorage;
use tracing::{debug, warn};

use super::error::RouterError;
use super::outcome::{FetchOutcome, ResponseSource};
use crate::fetch::Fetcher;

/// Serve `request` from the tile store `tag`, going to the network on a miss.
///
/// Only `200` responses are stored. When the network fails the store is
/// checked once more; nothing there yields [`FetchOutcome::Unavailable`].
pub async fn cache_first<S, F>(
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
    storage.open(tag).await?;

    if let Some(entry) = storage.match_in(tag, &key).await? {
        debug!(url = %request.url, tag, "[tile] cache hit");
        return Ok(FetchOutcome::respond(entry.response, ResponseSource::Cache, Policy::Tile));
    }
    debug!(url = %request.url, tag, "[tile] cache miss");

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_cacheable() && key.is_storable() {
                if let Err(e) = storage.put(tag, &key, &response).await {
                    warn!(url = %request.url, tag, error = %e, "[tile] failed to store tile");
                }
            }
            Ok(FetchOutcome::respond(response, ResponseSource::Network, Policy::Tile))
        }
        Err(e) => {
            warn!(url = %request.url, error = %e, "[tile] network failed, re-checking cache");
            match storage.match_in(tag, &key).await? {
                Some(entry) => Ok(FetchOutcome::respond(entry.response, ResponseSource::Cache, Policy::Tile)),
                None => Ok(FetchOutcome::Unavailable { policy: Policy::Tile }),
            }
        }
    }
}
