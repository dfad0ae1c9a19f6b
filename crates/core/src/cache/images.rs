//! Processed image storage.
//!
//! The `processed_images` table is the large-capacity tier. `ImageCache`
//! puts it in front of a small key-value namespace and derives
//! version-tagged keys from source URLs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::StoreDb;
use super::hash::image_key;
use super::kv::KvStore;
use super::tiered::{CacheBackend, CacheEntry, TieredCache};
use crate::Error;

/// Key-value namespace mirroring small processed payloads.
pub const PROCESSED_NAMESPACE: &str = "processedPngCache";

/// A processed image payload as stored in the primary tier.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProcessedImage {
    pub key: String,
    pub source_url: String,
    /// Encoded image, a `data:image/png;base64,...` URL.
    pub payload: String,
    pub payload_bytes: i64,
    pub created_at: String,
}

impl StoreDb {
    /// Insert or replace a processed image.
    pub async fn upsert_processed(&self, image: &ProcessedImage) -> Result<(), Error> {
        let image = image.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO processed_images (key, source_url, payload, payload_bytes, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(key) DO UPDATE SET
                        source_url = excluded.source_url,
                        payload = excluded.payload,
                        payload_bytes = excluded.payload_bytes,
                        created_at = excluded.created_at",
                    params![&image.key, &image.source_url, &image.payload, image.payload_bytes, &image.created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a processed image by cache key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_processed(&self, key: &str) -> Result<Option<ProcessedImage>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ProcessedImage>, Error> {
                let result = conn.query_row(
                    "SELECT key, source_url, payload, payload_bytes, created_at
                     FROM processed_images WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(ProcessedImage {
                            key: row.get(0)?,
                            source_url: row.get(1)?,
                            payload: row.get(2)?,
                            payload_bytes: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                );

                match result {
                    Ok(image) => Ok(Some(image)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    pub async fn processed_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM processed_images", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete processed images whose source URL matches a domain pattern.
    ///
    /// Returns the keys of the deleted entries.
    pub async fn purge_processed_by_domain(&self, domain: &str) -> Result<Vec<String>, Error> {
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let keys = select_keys(&tx, "SELECT key FROM processed_images WHERE source_url LIKE ?1", params![pattern])?;
                tx.execute("DELETE FROM processed_images WHERE source_url LIKE ?1", params![pattern])?;
                tx.commit()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until count <= max_entries.
    ///
    /// Returns the keys of the deleted entries.
    pub async fn purge_processed_lru(&self, max_entries: usize) -> Result<Vec<String>, Error> {
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let count: i64 = tx.query_row("SELECT COUNT(*) FROM processed_images", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(Vec::new());
                }

                let keys = select_keys(
                    &tx,
                    "SELECT key FROM processed_images ORDER BY created_at ASC, key ASC LIMIT ?1",
                    params![count - max],
                )?;
                for key in &keys {
                    tx.execute("DELETE FROM processed_images WHERE key = ?1", params![key])?;
                }
                tx.commit()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every processed image.
    pub async fn clear_processed(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM processed_images", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn select_keys(conn: &rusqlite::Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<String>, Error> {
    let mut stmt = conn.prepare(sql)?;
    let keys = stmt.query_map(params, |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}

#[async_trait]
impl CacheBackend for StoreDb {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.get_processed(key).await?.map(|image| image.payload))
    }

    async fn put(&self, entry: CacheEntry<'_>) -> Result<(), Error> {
        self.upsert_processed(&ProcessedImage {
            key: entry.key.to_string(),
            source_url: entry.source.to_string(),
            payload: entry.payload.to_string(),
            payload_bytes: entry.payload.len() as i64,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
        .await
    }
}

/// Processed-image cache keyed by source URL.
///
/// SQLite is the primary tier; payloads under the mirror threshold are
/// also kept in a key-value namespace. Maintenance operations keep both
/// tiers in step.
#[derive(Clone, Debug)]
pub struct ImageCache {
    tiers: TieredCache,
    db: StoreDb,
    mirror: Arc<KvStore>,
}

impl ImageCache {
    /// SQLite first, then the key-value namespace for payloads under `mirror_threshold`.
    pub fn with_backends(db: StoreDb, kv: KvStore, mirror_threshold: usize) -> Self {
        let mirror = Arc::new(kv);
        let tiers = TieredCache::builder()
            .tier(Arc::new(db.clone()))
            .bounded_tier(mirror.clone(), mirror_threshold)
            .build();
        Self { tiers, db, mirror }
    }

    /// Look up the processed payload for `url`. Storage failures read as a miss.
    pub async fn get(&self, url: &str) -> Option<String> {
        self.tiers.try_get(&image_key(url)).await
    }

    /// Store the processed payload for `url`. Never fails.
    pub async fn set(&self, url: &str, payload: &str) {
        let key = image_key(url);
        self.tiers.try_set(CacheEntry { key: &key, source: url, payload }).await;
    }

    /// Primary-tier record for `url`, with its metadata.
    pub async fn entry(&self, url: &str) -> Result<Option<ProcessedImage>, Error> {
        self.db.get_processed(&image_key(url)).await
    }

    /// Number of entries in the primary tier.
    pub async fn count(&self) -> Result<u64, Error> {
        self.db.processed_count().await
    }

    /// Drop entries whose source URL matches `domain` from both tiers.
    pub async fn purge_domain(&self, domain: &str) -> Result<u64, Error> {
        let keys = self.db.purge_processed_by_domain(domain).await?;
        self.forget_mirrored(&keys).await
    }

    /// Keep only the newest `max_entries` entries.
    pub async fn purge_lru(&self, max_entries: usize) -> Result<u64, Error> {
        let keys = self.db.purge_processed_lru(max_entries).await?;
        self.forget_mirrored(&keys).await
    }

    /// Empty both tiers. Returns the number of primary-tier entries removed.
    pub async fn clear(&self) -> Result<u64, Error> {
        let deleted = self.db.clear_processed().await?;
        self.mirror.clear().await?;
        Ok(deleted)
    }

    async fn forget_mirrored(&self, keys: &[String]) -> Result<u64, Error> {
        for key in keys {
            self.mirror.remove(key).await?;
        }
        Ok(keys.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_image(url: &str, created_at: &str) -> ProcessedImage {
        ProcessedImage {
            key: image_key(url),
            source_url: url.to_string(),
            payload: "data:image/png;base64,AAAA".to_string(),
            payload_bytes: 26,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let image = make_image("https://example.com/a.jpg", "2026-01-01T00:00:00Z");
        db.upsert_processed(&image).await.unwrap();

        let retrieved = db.get_processed(&image.key).await.unwrap().unwrap();
        assert_eq!(retrieved.source_url, image.source_url);
        assert_eq!(retrieved.payload, image.payload);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(db.get_processed("v1:nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_processed(&make_image("https://example.com/a.jpg", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        db.upsert_processed(&make_image("https://other.com/b.jpg", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        let purged = db.purge_processed_by_domain("example.com").await.unwrap();
        assert_eq!(purged, vec![image_key("https://example.com/a.jpg")]);
        assert!(db.get_processed(&image_key("https://example.com/a.jpg")).await.unwrap().is_none());
        assert!(db.get_processed(&image_key("https://other.com/b.jpg")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru_keeps_newest() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_processed(&make_image("https://example.com/old.jpg", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        db.upsert_processed(&make_image("https://example.com/new.jpg", "2026-02-01T00:00:00Z"))
            .await
            .unwrap();

        let purged = db.purge_processed_lru(1).await.unwrap();
        assert_eq!(purged, vec![image_key("https://example.com/old.jpg")]);
        assert_eq!(db.processed_count().await.unwrap(), 1);
        assert!(db.get_processed(&image_key("https://example.com/new.jpg")).await.unwrap().is_some());
        assert!(db.purge_processed_lru(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_cache_round_trip_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), "processedPngCache", 1024 * 1024).await.unwrap();
        let cache = ImageCache::with_backends(db.clone(), kv, 500_000);

        assert_eq!(cache.get("https://example.com/a.jpg").await, None);
        cache.set("https://example.com/a.jpg", "data:image/png;base64,AAAA").await;
        assert_eq!(cache.get("https://example.com/a.jpg").await.as_deref(), Some("data:image/png;base64,AAAA"));

        let stored = db.get_processed(&image_key("https://example.com/a.jpg")).await.unwrap().unwrap();
        assert_eq!(stored.source_url, "https://example.com/a.jpg");
        assert_eq!(stored.payload_bytes, 26);
    }

    #[tokio::test]
    async fn test_image_cache_served_from_fallback_after_primary_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), "processedPngCache", 1024 * 1024).await.unwrap();
        let cache = ImageCache::with_backends(db.clone(), kv, 500_000);

        cache.set("https://example.com/a.jpg", "data:image/png;base64,AAAA").await;
        db.clear_processed().await.unwrap();

        assert_eq!(cache.get("https://example.com/a.jpg").await.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[tokio::test]
    async fn test_image_cache_purge_domain_clears_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), "processedPngCache", 1024 * 1024).await.unwrap();
        let cache = ImageCache::with_backends(db, kv, 500_000);

        cache.set("https://example.com/a.jpg", "data:image/png;base64,AAAA").await;
        cache.set("https://other.com/b.jpg", "data:image/png;base64,BBBB").await;

        assert_eq!(cache.purge_domain("example.com").await.unwrap(), 1);
        assert_eq!(cache.get("https://example.com/a.jpg").await, None);
        assert!(cache.get("https://other.com/b.jpg").await.is_some());
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_image_cache_clear_empties_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), "processedPngCache", 1024 * 1024).await.unwrap();
        let cache = ImageCache::with_backends(db, kv, 500_000);

        cache.set("https://example.com/a.jpg", "data:image/png;base64,AAAA").await;
        assert!(cache.entry("https://example.com/a.jpg").await.unwrap().is_some());

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert_eq!(cache.get("https://example.com/a.jpg").await, None);
    }
}
