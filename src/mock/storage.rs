//! Cache storage wrapper with injectable failures.

use std::sync::Mutex;

use earcheo_protocol::{CacheKey, Response};
use earcheo_store::{CacheStorage, StoreError, StoreResult, StoredEntry};

use super::failure::{FailureConfig, FailureInjector, StoreOp};

/// Wraps a real storage and fails or stalls selected operations on demand.
///
/// A batch write counts as one `Put` call per entry and is rejected as a
/// whole when any of those calls is made to fail.
#[derive(Debug)]
pub struct FlakyStorage<S> {
    inner: S,
    injector: Mutex<FailureInjector>,
    stalled: Mutex<Vec<StoreOp>>,
}

impl<S: CacheStorage> FlakyStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            injector: Mutex::new(FailureInjector::new()),
            stalled: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inject(&self, op: StoreOp, config: FailureConfig) {
        self.injector().inject(op, config);
    }

    pub fn fail(&self, op: StoreOp, message: impl Into<String>) {
        self.injector().inject_error(op, message);
    }

    /// Make `op` hang forever, as a backend that never answers.
    pub fn stall(&self, op: StoreOp) {
        self.stalled().push(op);
    }

    pub fn heal(&self) {
        self.injector().clear();
        self.stalled().clear();
    }

    fn stalled(&self) -> std::sync::MutexGuard<'_, Vec<StoreOp>> {
        self.stalled.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injector(&self) -> std::sync::MutexGuard<'_, FailureInjector> {
        self.injector.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, op: StoreOp, tag: Option<&str>) -> StoreResult<()> {
        match self.injector().check(op, tag) {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => Ok(()),
        }
    }

    async fn gate(&self, op: StoreOp, tag: Option<&str>) -> StoreResult<()> {
        let stalled = self.stalled().contains(&op);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.check(op, tag)
    }
}

impl<S: CacheStorage> CacheStorage for FlakyStorage<S> {
    async fn open(&self, tag: &str) -> StoreResult<()> {
        self.gate(StoreOp::Open, Some(tag)).await?;
        self.inner.open(tag).await
    }

    async fn has(&self, tag: &str) -> StoreResult<bool> {
        self.gate(StoreOp::Has, Some(tag)).await?;
        self.inner.has(tag).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.gate(StoreOp::Keys, None).await?;
        self.inner.keys().await
    }

    async fn delete(&self, tag: &str) -> StoreResult<bool> {
        self.gate(StoreOp::Delete, Some(tag)).await?;
        self.inner.delete(tag).await
    }

    async fn match_in(&self, tag: &str, key: &CacheKey) -> StoreResult<Option<StoredEntry>> {
        self.gate(StoreOp::Match, Some(tag)).await?;
        self.inner.match_in(tag, key).await
    }

    async fn put(&self, tag: &str, key: &CacheKey, response: &Response) -> StoreResult<()> {
        self.gate(StoreOp::Put, Some(tag)).await?;
        self.inner.put(tag, key, response).await
    }

    async fn put_all(&self, tag: &str, entries: &[(CacheKey, Response)]) -> StoreResult<()> {
        for _ in entries {
            self.gate(StoreOp::Put, Some(tag)).await?;
        }
        self.inner.put_all(tag, entries).await
    }

    async fn entries(&self, tag: &str) -> StoreResult<Vec<CacheKey>> {
        self.gate(StoreOp::Entries, Some(tag)).await?;
        self.inner.entries(tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earcheo_store::MemoryStorage;

    #[tokio::test]
    async fn test_injected_put_failure() {
        let storage = FlakyStorage::new(MemoryStorage::new());
        storage.fail(StoreOp::Put, "quota exceeded");

        let key = CacheKey::get("https://earcheo.cz/index.html");
        let err = storage
            .put("earcheo-v1.1", &key, &Response::ok("<html>"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(ref m) if m == "quota exceeded"));
        assert!(storage.inner().is_empty().await);

        storage.heal();
        storage.put("earcheo-v1.1", &key, &Response::ok("<html>")).await.unwrap();
        assert_eq!(storage.inner().len().await, 1);
    }

    #[tokio::test]
    async fn test_batch_rejected_when_one_put_fails() {
        let storage = FlakyStorage::new(MemoryStorage::new());
        storage.inject(StoreOp::Put, FailureConfig::error("quota exceeded").after(1));

        let batch = vec![
            (CacheKey::get("https://earcheo.cz/"), Response::ok("root")),
            (CacheKey::get("https://earcheo.cz/index.html"), Response::ok("index")),
        ];
        assert!(storage.put_all("earcheo-v1.1", &batch).await.is_err());
        assert!(storage.inner().is_empty().await);
    }

    #[tokio::test]
    async fn test_match_any_sees_injected_read_failure() {
        let storage = FlakyStorage::new(MemoryStorage::new());
        storage.open("earcheo-v1.1").await.unwrap();
        storage.fail(StoreOp::Match, "disk gone");

        let result = storage.match_any(&CacheKey::get("https://earcheo.cz/")).await;
        assert!(result.is_err());
    }
}
