//! Link preview cache.
//!
//! Absence of a key means "not yet resolved". A link that resolved to
//! nothing is stored with a sentinel and stays that way.

use super::kv::KvStore;

/// Namespace used for preview entries.
pub const PREVIEW_NAMESPACE: &str = "previewImageCache";

const NONE_SENTINEL: &str = "__NONE__";

/// Resolved state of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEntry {
    /// A preview image URL.
    Image(String),
    /// Resolution found nothing.
    None,
}

impl PreviewEntry {
    fn encode(&self) -> &str {
        match self {
            PreviewEntry::Image(url) => url,
            PreviewEntry::None => NONE_SENTINEL,
        }
    }

    fn decode(raw: String) -> Option<Self> {
        match raw.as_str() {
            "" => None,
            NONE_SENTINEL => Some(PreviewEntry::None),
            _ => Some(PreviewEntry::Image(raw)),
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            PreviewEntry::Image(url) => Some(url),
            PreviewEntry::None => None,
        }
    }
}

/// Best-effort persistent map from outbound link to [`PreviewEntry`].
#[derive(Debug)]
pub struct PreviewCache {
    store: KvStore,
}

impl PreviewCache {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// `None` when the link has not been resolved (or storage is unreadable).
    pub async fn get(&self, link: &str) -> Option<PreviewEntry> {
        match self.store.get(link).await {
            Ok(raw) => raw.and_then(PreviewEntry::decode),
            Err(e) => {
                tracing::warn!(link, error = %e, "preview cache read failed");
                None
            }
        }
    }

    /// Persist a resolution. Failures are logged and dropped.
    pub async fn set(&self, link: &str, entry: &PreviewEntry) {
        if let Err(e) = self.store.set(link, entry.encode()).await {
            tracing::warn!(link, error = %e, "preview cache write failed");
        }
    }

    /// Forget every resolution, returning how many there were.
    pub async fn clear(&self) -> Result<usize, crate::Error> {
        self.store.clear().await
    }
}
