//! Link preview resolution.
//!
//! Resolves a best-effort preview image for an outbound store link:
//! 1. Cached resolution (image or "none")
//! 2. Caller-supplied fallback URL, if it is a valid http(s) URL
//! 3. Link metadata service (Microlink)
//! 4. Otherwise "none", cached so the link is never looked up again
//!
//! Nothing here fails to the caller. Service errors count as "nothing found".

pub mod error;
pub mod microlink;
pub mod response;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::PreviewError;
pub use microlink::{MicrolinkClient, MicrolinkConfig};
pub use response::MicrolinkResponse;

use crate::fetch::is_http_url;
use giftlist_core::{PreviewCache, PreviewEntry};

/// A service that can find a representative image for a web page.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// `Ok(None)` when the service answered but had no usable image.
    async fn preview_image(&self, link: &str) -> Result<Option<String>, PreviewError>;
}

/// How a preview was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResolution {
    /// Earlier resolution read from the cache. `None` is a cached "none".
    Cached(Option<String>),
    /// The caller's fallback URL was accepted.
    Fallback(String),
    /// Found by the metadata service.
    Service(String),
    /// Nothing found. Cached from now on.
    None,
}

impl PreviewResolution {
    pub fn into_url(self) -> Option<String> {
        match self {
            PreviewResolution::Cached(url) => url,
            PreviewResolution::Fallback(url) | PreviewResolution::Service(url) => Some(url),
            PreviewResolution::None => None,
        }
    }
}

/// Resolver backed by a persistent preview cache and a metadata service.
pub struct PreviewResolver {
    cache: PreviewCache,
    service: Arc<dyn MetadataService>,
}

impl PreviewResolver {
    pub fn new(cache: PreviewCache, service: Arc<dyn MetadataService>) -> Self {
        Self { cache, service }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Preview image URL for `link`, or `None` when there is none.
    pub async fn resolve_preview_image(&self, link: &str, fallback_image_url: Option<&str>) -> Option<String> {
        self.resolve_detailed(link, fallback_image_url).await.into_url()
    }

    /// Like [`resolve_preview_image`](Self::resolve_preview_image) but reports which step answered.
    #[tracing::instrument(skip(self, fallback_image_url))]
    pub async fn resolve_detailed(&self, link: &str, fallback_image_url: Option<&str>) -> PreviewResolution {
        if let Some(entry) = self.cache.get(link).await {
            return PreviewResolution::Cached(entry.into_option());
        }

        if let Some(fallback) = fallback_image_url.filter(|url| is_http_url(url)) {
            self.cache.set(link, &PreviewEntry::Image(fallback.to_string())).await;
            return PreviewResolution::Fallback(fallback.to_string());
        }

        if is_http_url(link) {
            match self.service.preview_image(link).await {
                Ok(Some(url)) => {
                    self.cache.set(link, &PreviewEntry::Image(url.clone())).await;
                    return PreviewResolution::Service(url);
                }
                Ok(None) => tracing::debug!("metadata service found no preview image"),
                Err(e) => tracing::warn!(error = %e, "metadata service lookup failed"),
            }
        }

        self.cache.set(link, &PreviewEntry::None).await;
        PreviewResolution::None
    }
}
