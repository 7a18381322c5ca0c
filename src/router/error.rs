use earcheo_protocol::FetchError;
use earcheo_store::StoreError;

use super::lifecycle::LifecycleError;
use crate::config::ConfigError;

/// Errors surfaced by router events.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Network failed and no cached copy could stand in.
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error("cache storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A warm-up URL could not be cached; nothing was stored.
    #[error("install failed on {url}: {reason}")]
    Install { url: String, reason: String },

    #[error("invalid router configuration: {0}")]
    Config(#[from] ConfigError),
}
