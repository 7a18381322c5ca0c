//! Disk-backed cache storage.
//!
//! Directory layout: `<root>/<store>/.store.json` plus
//! `<root>/<store>/entries/<sha256(key)>.json`. Entries and manifests are
//! written to a temporary file and renamed into place, so readers only ever
//! see complete documents. Each write runs to completion on the blocking
//! pool even when the awaiting future is dropped.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use earcheo_protocol::{CacheKey, Response};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::storage::{
    validate_key, validate_tag, CacheStorage, StoreError, StoreResult, StoredEntry,
};

const MANIFEST_FILENAME: &str = ".store.json";
const ENTRIES_DIR: &str = "entries";

/// Per-store manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreManifest {
    tag: String,
    created_at: DateTime<Utc>,
}

/// Storage rooted at a directory.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskStorage {
    /// Storage under `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `tag`. Plain tags are used verbatim, anything else is
    /// hex-encoded.
    fn store_dir(&self, tag: &str) -> PathBuf {
        let plain = !tag.starts_with('.')
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if plain {
            self.root.join(tag)
        } else {
            self.root.join(format!("x-{}", hex::encode(tag)))
        }
    }

    fn entry_path(&self, tag: &str, key: &CacheKey) -> PathBuf {
        self.store_dir(tag)
            .join(ENTRIES_DIR)
            .join(format!("{}.json", key.digest()))
    }

    fn tmp_path(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("tmp-{}-{}", std::process::id(), n))
    }

    async fn write_atomic(&self, path: &Path, contents: Vec<u8>) -> StoreResult<()> {
        let staged = vec![Staged {
            tmp: self.tmp_path(path),
            path: path.to_path_buf(),
            contents,
        }];
        run_blocking(move || commit(&staged)).await
    }

    async fn read_manifest(&self, dir: &Path) -> StoreResult<Option<StoreManifest>> {
        let path = dir.join(MANIFEST_FILENAME);
        let content = match fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn manifest_for(&self, tag: &str) -> StoreResult<Option<StoreManifest>> {
        self.read_manifest(&self.store_dir(tag)).await
    }
}

impl CacheStorage for DiskStorage {
    async fn open(&self, tag: &str) -> StoreResult<()> {
        validate_tag(tag)?;
        let dir = self.store_dir(tag);
        fs::create_dir_all(dir.join(ENTRIES_DIR)).await?;

        if self.read_manifest(&dir).await?.is_none() {
            let manifest = StoreManifest {
                tag: tag.to_string(),
                created_at: Utc::now(),
            };
            let bytes = serde_json::to_vec_pretty(&manifest)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            self.write_atomic(&dir.join(MANIFEST_FILENAME), bytes).await?;
            debug!(tag, dir = %dir.display(), "created store");
        }
        Ok(())
    }

    async fn has(&self, tag: &str) -> StoreResult<bool> {
        Ok(self.manifest_for(tag).await?.is_some())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let mut read_dir = match fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut manifests = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match self.read_manifest(&entry.path()).await? {
                Some(m) => manifests.push(m),
                None => warn!(dir = %entry.path().display(), "skipping directory without store manifest"),
            }
        }

        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.tag.cmp(&b.tag)));
        Ok(manifests.into_iter().map(|m| m.tag).collect())
    }

    async fn delete(&self, tag: &str) -> StoreResult<bool> {
        let dir = self.store_dir(tag);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(tag, "deleted store");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_in(&self, tag: &str, key: &CacheKey) -> StoreResult<Option<StoredEntry>> {
        if !key.is_storable() {
            return Ok(None);
        }
        let path = self.entry_path(tag, key);
        let content = match fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: StoredEntry = serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        // Digest collision guard
        if entry.key != *key {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn put(&self, tag: &str, key: &CacheKey, response: &Response) -> StoreResult<()> {
        validate_key(key)?;
        self.open(tag).await?;

        let entry = StoredEntry::new(key.clone(), response.clone());
        let bytes = serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.write_atomic(&self.entry_path(tag, key), bytes).await
    }

    async fn put_all(&self, tag: &str, entries: &[(CacheKey, Response)]) -> StoreResult<()> {
        validate_tag(tag)?;
        for (key, _) in entries {
            validate_key(key)?;
        }

        let mut staged = Vec::with_capacity(entries.len());
        for (key, response) in entries {
            let entry = StoredEntry::new(key.clone(), response.clone());
            let contents = serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
            let path = self.entry_path(tag, key);
            staged.push(Staged {
                tmp: self.tmp_path(&path),
                path,
                contents,
            });
        }

        self.open(tag).await?;
        let count = staged.len();
        run_blocking(move || commit(&staged)).await?;
        debug!(tag, entries = count, "stored batch");
        Ok(())
    }

    async fn entries(&self, tag: &str) -> StoreResult<Vec<CacheKey>> {
        let dir = self.store_dir(tag).join(ENTRIES_DIR);
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path).await?;
            match serde_json::from_slice::<StoredEntry>(&content) {
                Ok(stored) => keys.push(stored.key),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable cache entry"),
            }
        }
        Ok(keys)
    }
}

/// A document waiting to be renamed into place.
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
    contents: Vec<u8>,
}

/// Write every staged document to its temp file, then rename them all.
///
/// A failed write removes every temp file. A failed rename also removes the
/// documents already renamed, so a batch is never half visible.
fn commit(staged: &[Staged]) -> io::Result<()> {
    for (i, doc) in staged.iter().enumerate() {
        if let Err(e) = std::fs::write(&doc.tmp, &doc.contents) {
            remove_all(staged[..=i].iter().map(|d| &d.tmp));
            return Err(e);
        }
    }
    for (i, doc) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(&doc.tmp, &doc.path) {
            remove_all(staged[..i].iter().map(|d| &d.path));
            remove_all(staged[i..].iter().map(|d| &d.tmp));
            return Err(e);
        }
    }
    Ok(())
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to clean up cache file");
            }
        }
    }
}

async fn run_blocking<F>(f: F) -> StoreResult<()>
where
    F: FnOnce() -> io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))?
        .map_err(StoreError::from)
}
