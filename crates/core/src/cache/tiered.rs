//! Best-effort cache over several backends tried in priority order.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;

/// One entry handed to a backend on write.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry<'a> {
    pub key: &'a str,
    /// Source the payload was derived from (URL or link).
    pub source: &'a str,
    pub payload: &'a str,
}

/// A key-value store that can hold cached payloads.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn put(&self, entry: CacheEntry<'_>) -> Result<(), Error>;
}

struct Tier {
    backend: Arc<dyn CacheBackend>,
    /// Payloads of this size or larger skip the tier.
    max_payload: Option<usize>,
}

/// Backends tried in the order they were added.
///
/// Neither path returns an error: failed reads count as misses and failed
/// writes are logged and dropped. Writers for one key always compute the
/// same payload, so concurrent writes need no locking.
#[derive(Clone, Default)]
pub struct TieredCache {
    tiers: Arc<Vec<Tier>>,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.tiers.iter().map(|t| t.backend.name()).collect();
        f.debug_struct("TieredCache").field("tiers", &names).finish()
    }
}

impl TieredCache {
    pub fn builder() -> TieredCacheBuilder {
        TieredCacheBuilder { tiers: Vec::new() }
    }

    /// Return the first hit, checking tiers in priority order.
    pub async fn try_get(&self, key: &str) -> Option<String> {
        for tier in self.tiers.iter() {
            match tier.backend.get(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(key, tier = tier.backend.name(), "cache hit");
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key, tier = tier.backend.name(), error = %e, "cache read failed, treating as miss");
                }
            }
        }
        tracing::debug!(key, "cache miss");
        None
    }

    /// Write to every tier whose size limit admits the payload.
    pub async fn try_set(&self, entry: CacheEntry<'_>) {
        let size_hint = entry.payload.len();
        for tier in self.tiers.iter() {
            if tier.max_payload.is_some_and(|max| size_hint >= max) {
                tracing::debug!(key = entry.key, tier = tier.backend.name(), size_hint, "payload too large for tier");
                continue;
            }
            if let Err(e) = tier.backend.put(entry).await {
                tracing::warn!(key = entry.key, tier = tier.backend.name(), error = %e, "cache write failed");
            }
        }
    }
}

/// Builder for [`TieredCache`].
pub struct TieredCacheBuilder {
    tiers: Vec<Tier>,
}

impl TieredCacheBuilder {
    /// Add a tier that accepts payloads of any size.
    pub fn tier(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.tiers.push(Tier { backend, max_payload: None });
        self
    }

    /// Add a tier that only accepts payloads smaller than `max_payload` bytes.
    pub fn bounded_tier(mut self, backend: Arc<dyn CacheBackend>, max_payload: usize) -> Self {
        self.tiers.push(Tier { backend, max_payload: Some(max_payload) });
        self
    }

    pub fn build(self) -> TieredCache {
        TieredCache { tiers: Arc::new(self.tiers) }
    }
}
