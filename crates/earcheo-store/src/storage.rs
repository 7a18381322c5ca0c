//! Storage trait and shared types.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use earcheo_protocol::{CacheKey, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cannot store responses to {0} requests")]
    UnsupportedMethod(String),

    #[error("invalid store tag: {0:?}")]
    InvalidTag(String),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// A stored response with its insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: CacheKey,
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(key: CacheKey, response: Response) -> Self {
        Self {
            key,
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Size summary of one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub tag: String,
    pub entries: usize,
    pub body_bytes: u64,
}

/// Named, version-tagged stores of request → response pairs.
///
/// Mirrors the host cache storage: stores are created on `open`, enumerated
/// in creation order by `keys`, and removed wholesale by `delete`. Lookups
/// never create a store.
pub trait CacheStorage: Send + Sync {
    /// Open the store for `tag`, creating it if it does not exist.
    fn open(&self, tag: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Whether a store for `tag` exists.
    fn has(&self, tag: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Tags of all existing stores, oldest first.
    fn keys(&self) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// Delete the store for `tag`. Returns whether it existed.
    fn delete(&self, tag: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Look up `key` in one store. A missing store is a miss.
    fn match_in(
        &self,
        tag: &str,
        key: &CacheKey,
    ) -> impl Future<Output = StoreResult<Option<StoredEntry>>> + Send;

    /// Write `response` under `key` in store `tag`, creating the store if
    /// needed. Replaces any previous entry for the key.
    fn put(
        &self,
        tag: &str,
        key: &CacheKey,
        response: &Response,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Write every entry into store `tag`, or none of them. Later entries
    /// for the same key win.
    fn put_all(
        &self,
        tag: &str,
        entries: &[(CacheKey, Response)],
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Keys stored under `tag`, in no particular order.
    fn entries(&self, tag: &str) -> impl Future<Output = StoreResult<Vec<CacheKey>>> + Send;

    /// Look up `key` across all stores in creation order; first hit wins.
    fn match_any(&self, key: &CacheKey) -> impl Future<Output = StoreResult<Option<StoredEntry>>> + Send {
        async move {
            for tag in self.keys().await? {
                if let Some(entry) = self.match_in(&tag, key).await? {
                    return Ok(Some(entry));
                }
            }
            Ok::<_, StoreError>(None)
        }
    }

    /// Entry count and body size of store `tag`.
    fn stats(&self, tag: &str) -> impl Future<Output = StoreResult<StoreStats>> + Send {
        async move {
            let mut stats = StoreStats {
                tag: tag.to_string(),
                ..Default::default()
            };
            for key in self.entries(tag).await? {
                if let Some(entry) = self.match_in(tag, &key).await? {
                    stats.entries += 1;
                    stats.body_bytes += entry.response.body.len() as u64;
                }
            }
            Ok::<_, StoreError>(stats)
        }
    }
}

impl<T: CacheStorage> CacheStorage for Arc<T> {
    fn open(&self, tag: &str) -> impl Future<Output = StoreResult<()>> + Send {
        (**self).open(tag)
    }

    fn has(&self, tag: &str) -> impl Future<Output = StoreResult<bool>> + Send {
        (**self).has(tag)
    }

    fn keys(&self) -> impl Future<Output = StoreResult<Vec<String>>> + Send {
        (**self).keys()
    }

    fn delete(&self, tag: &str) -> impl Future<Output = StoreResult<bool>> + Send {
        (**self).delete(tag)
    }

    fn match_in(
        &self,
        tag: &str,
        key: &CacheKey,
    ) -> impl Future<Output = StoreResult<Option<StoredEntry>>> + Send {
        (**self).match_in(tag, key)
    }

    fn put(
        &self,
        tag: &str,
        key: &CacheKey,
        response: &Response,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        (**self).put(tag, key, response)
    }

    fn put_all(
        &self,
        tag: &str,
        entries: &[(CacheKey, Response)],
    ) -> impl Future<Output = StoreResult<()>> + Send {
        (**self).put_all(tag, entries)
    }

    fn entries(&self, tag: &str) -> impl Future<Output = StoreResult<Vec<CacheKey>>> + Send {
        (**self).entries(tag)
    }

    fn match_any(&self, key: &CacheKey) -> impl Future<Output = StoreResult<Option<StoredEntry>>> + Send {
        (**self).match_any(key)
    }

    fn stats(&self, tag: &str) -> impl Future<Output = StoreResult<StoreStats>> + Send {
        (**self).stats(tag)
    }
}

/// Reject tags that cannot name a store.
pub(crate) fn validate_tag(tag: &str) -> StoreResult<()> {
    if tag.trim().is_empty() {
        return Err(StoreError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Reject keys whose responses cannot be stored.
pub(crate) fn validate_key(key: &CacheKey) -> StoreResult<()> {
    if !key.is_storable() {
        return Err(StoreError::UnsupportedMethod(key.method.clone()));
    }
    Ok(())
}
