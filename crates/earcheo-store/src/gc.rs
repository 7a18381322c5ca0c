//! Generation-based garbage collection
//!
//! Entries are never evicted individually. Whole stores go away when their
//! version tag stops being current (activation) or when the page asks for a
//! full clear. A failed delete is recorded and left for the next run.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{CacheStorage, StoreResult};

/// Result of a garbage collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcResult {
    /// Number of stores scanned
    pub scanned: usize,
    /// Tags of stores deleted
    pub deleted: Vec<String>,
    /// Tags of stores kept
    pub retained: Vec<String>,
    /// Errors encountered (non-fatal)
    pub errors: Vec<String>,
}

impl GcResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Delete every store whose tag is not in `keep`.
pub async fn delete_stale<S: CacheStorage>(storage: &S, keep: &[&str]) -> StoreResult<GcResult> {
    let tags = storage.keys().await?;
    let mut result = GcResult {
        scanned: tags.len(),
        ..Default::default()
    };

    for tag in tags {
        if keep.contains(&tag.as_str()) {
            result.retained.push(tag);
            continue;
        }
        delete_one(storage, tag, &mut result).await;
    }

    Ok(result)
}

/// Delete every store regardless of tag.
pub async fn delete_all<S: CacheStorage>(storage: &S) -> StoreResult<GcResult> {
    delete_stale(storage, &[]).await
}

async fn delete_one<S: CacheStorage>(storage: &S, tag: String, result: &mut GcResult) {
    match storage.delete(&tag).await {
        Ok(true) => {
            info!(tag = %tag, "[gc] deleted store");
            result.deleted.push(tag);
        }
        // Removed concurrently
        Ok(false) => {}
        Err(e) => {
            warn!(tag = %tag, error = %e, "[gc] failed to delete store");
            result.errors.push(format!("failed to delete {}: {}", tag, e));
        }
    }
}
