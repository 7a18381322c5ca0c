//! In-memory cache storage.

use std::collections::BTreeMap;

use earcheo_protocol::{CacheKey, Response};
use tokio::sync::RwLock;

use crate::storage::{validate_key, validate_tag, CacheStorage, StoreResult, StoredEntry};

type Store = BTreeMap<CacheKey, StoredEntry>;

/// Process-local storage. Stores are kept in creation order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<Vec<(String, Store)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all stores.
    pub async fn len(&self) -> usize {
        self.stores.read().await.iter().map(|(_, s)| s.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl CacheStorage for MemoryStorage {
    async fn open(&self, tag: &str) -> StoreResult<()> {
        validate_tag(tag)?;
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|(t, _)| t == tag) {
            stores.push((tag.to_string(), Store::new()));
        }
        Ok(())
    }

    async fn has(&self, tag: &str) -> StoreResult<bool> {
        Ok(self.stores.read().await.iter().any(|(t, _)| t == tag))
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.stores.read().await.iter().map(|(t, _)| t.clone()).collect())
    }

    async fn delete(&self, tag: &str) -> StoreResult<bool> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|(t, _)| t != tag);
        Ok(stores.len() != before)
    }

    async fn match_in(&self, tag: &str, key: &CacheKey) -> StoreResult<Option<StoredEntry>> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|(t, _)| t == tag)
            .and_then(|(_, store)| store.get(key))
            .cloned())
    }

    async fn put(&self, tag: &str, key: &CacheKey, response: &Response) -> StoreResult<()> {
        validate_tag(tag)?;
        validate_key(key)?;
        let entry = StoredEntry::new(key.clone(), response.clone());

        let mut stores = self.stores.write().await;
        match stores.iter_mut().find(|(t, _)| t == tag) {
            Some((_, store)) => {
                store.insert(key.clone(), entry);
            }
            None => {
                let mut store = Store::new();
                store.insert(key.clone(), entry);
                stores.push((tag.to_string(), store));
            }
        }
        Ok(())
    }

    async fn put_all(&self, tag: &str, entries: &[(CacheKey, Response)]) -> StoreResult<()> {
        validate_tag(tag)?;
        for (key, _) in entries {
            validate_key(key)?;
        }
        let batch: Vec<StoredEntry> = entries
            .iter()
            .map(|(key, response)| StoredEntry::new(key.clone(), response.clone()))
            .collect();

        let mut stores = self.stores.write().await;
        let index = match stores.iter().position(|(t, _)| t == tag) {
            Some(i) => i,
            None => {
                stores.push((tag.to_string(), Store::new()));
                stores.len() - 1
            }
        };
        let store = &mut stores[index].1;
        for entry in batch {
            store.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn entries(&self, tag: &str) -> StoreResult<Vec<CacheKey>> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, store)| store.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    fn tile_key() -> CacheKey {
        CacheKey::get("https://tile.openstreetmap.org/12/2200/1390.png")
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_ordered() {
        let storage = MemoryStorage::new();
        storage.open("earcheo-v1.1").await.unwrap();
        storage.open("earcheo-map-tiles-v1").await.unwrap();
        storage.open("earcheo-v1.1").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["earcheo-v1.1".to_string(), "earcheo-map-tiles-v1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_put_then_match() {
        let storage = MemoryStorage::new();
        storage.put("tiles", &tile_key(), &Response::ok("png")).await.unwrap();

        let entry = storage.match_in("tiles", &tile_key()).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"png".to_vec());
        assert!(storage.has("tiles").await.unwrap());
        assert_eq!(storage.match_in("assets", &tile_key()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_does_not_create_store() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.match_in("tiles", &tile_key()).await.unwrap(), None);
        assert!(!storage.has("tiles").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let storage = MemoryStorage::new();
        storage.put("tiles", &tile_key(), &Response::ok("old")).await.unwrap();
        storage.put("tiles", &tile_key(), &Response::ok("new")).await.unwrap();

        let entry = storage.match_in("tiles", &tile_key()).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"new".to_vec());
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let storage = MemoryStorage::new();
        let key = CacheKey::new("POST", "https://earcheo.cz/api/findings");
        let err = storage.put("assets", &key, &Response::ok("{}")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedMethod(m) if m == "POST"));
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let storage = MemoryStorage::new();
        let batch = vec![
            (CacheKey::get("https://earcheo.cz/"), Response::ok("root")),
            (CacheKey::new("POST", "https://earcheo.cz/api/findings"), Response::ok("{}")),
        ];
        let err = storage.put_all("earcheo-v1.1", &batch).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedMethod(_)));
        assert!(storage.is_empty().await);
        assert!(!storage.has("earcheo-v1.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_all_writes_every_entry() {
        let storage = MemoryStorage::new();
        let batch = vec![
            (CacheKey::get("https://earcheo.cz/"), Response::ok("root")),
            (CacheKey::get("https://earcheo.cz/index.html"), Response::ok("index")),
        ];
        storage.put_all("earcheo-v1.1", &batch).await.unwrap();
        assert_eq!(storage.len().await, 2);
        assert_eq!(storage.keys().await.unwrap(), vec!["earcheo-v1.1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = MemoryStorage::new();
        storage.open("old").await.unwrap();
        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_store() {
        let storage = MemoryStorage::new();
        storage.put("first", &tile_key(), &Response::ok("a")).await.unwrap();
        storage.put("second", &tile_key(), &Response::ok("b")).await.unwrap();

        let entry = storage.match_any(&tile_key()).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"a".to_vec());
    }

    #[tokio::test]
    async fn test_stats() {
        let storage = MemoryStorage::new();
        storage.put("tiles", &tile_key(), &Response::ok("12345")).await.unwrap();
        storage
            .put("tiles", &CacheKey::get("https://tile.openstreetmap.org/1/0/0.png"), &Response::ok("123"))
            .await
            .unwrap();

        let stats = storage.stats("tiles").await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.body_bytes, 8);
    }
}
