//! Small JSON-file key-value store with a byte capacity.
//!
//! Each namespace is one JSON object on disk. A write that would push the
//! serialized namespace past its capacity fails with `StorageFull`, the same
//! way a browser's local storage rejects writes over quota.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::tiered::{CacheBackend, CacheEntry};
use crate::Error;

/// A capacity-bounded key-value namespace persisted as a JSON file.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

fn valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl KvStore {
    /// Open (or lazily create) the namespace `namespace` inside `dir`.
    pub async fn open(dir: impl AsRef<Path>, namespace: &str, capacity: usize) -> Result<Self, Error> {
        if !valid_namespace(namespace) {
            return Err(Error::InvalidInput(format!("invalid namespace: {namespace}")));
        }

        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Storage(format!("failed to create {}: {e}", dir.display())))?;

        Ok(Self { path: dir.join(format!("{namespace}.json")), capacity, write_lock: Mutex::new(()) })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read the whole namespace. A missing or unreadable file is an empty namespace.
    async fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::Storage(format!("failed to read {}: {e}", self.path.display()))),
        };

        match serde_json::from_slice(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding corrupt key-value file");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> Result<(), Error> {
        let serialized = serde_json::to_vec(map)?;
        if serialized.len() > self.capacity {
            return Err(Error::StorageFull { needed: serialized.len(), capacity: self.capacity });
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &serialized)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("failed to replace {}: {e}", self.path.display())))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.load().await?.remove(key))
    }

    /// Insert or replace `key`. Fails without modifying the file when over capacity.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    /// Remove `key`, returning whether it was present.
    pub async fn remove(&self, key: &str) -> Result<bool, Error> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let existed = map.remove(key).is_some();
        if existed {
            self.save(&map).await?;
        }
        Ok(existed)
    }

    /// Remove every key in the namespace, returning how many there were.
    pub async fn clear(&self) -> Result<usize, Error> {
        let _guard = self.write_lock.lock().await;
        let count = self.load().await?.len();
        self.save(&BTreeMap::new()).await?;
        Ok(count)
    }

    pub async fn len(&self) -> Result<usize, Error> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl CacheBackend for KvStore {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        KvStore::get(self, key).await
    }

    async fn put(&self, entry: CacheEntry<'_>) -> Result<(), Error> {
        self.set(entry.key, entry.payload).await
    }
}
