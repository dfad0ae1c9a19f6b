//! cache_purge tool implementation.
//!
//! Purges processed images by domain, by count, or entirely, and can forget
//! resolved link previews.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use giftlist_core::{Error, ImageCache, PreviewCache};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries whose source URL matches this domain pattern.
    #[serde(default)]
    pub domain: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Drop every processed image.
    #[serde(default)]
    pub all: bool,

    /// Forget resolved link previews, including links cached as having none.
    #[serde(default)]
    pub previews: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of processed images deleted.
    pub deleted: u64,

    /// Number of link previews forgotten.
    #[serde(default)]
    pub previews_deleted: usize,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    cache: &ImageCache, previews: &PreviewCache, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if !params.all && !params.previews && params.domain.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of domain, max_entries, all, or previews must be specified".to_string(),
        )
        .into());
    }

    let mut deleted_total = 0u64;

    if params.all {
        deleted_total += cache.clear().await?;
    } else {
        if let Some(domain) = params.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            deleted_total += cache.purge_domain(domain).await?;
        }

        if let Some(max_entries) = params.max_entries {
            deleted_total += cache.purge_lru(max_entries).await?;
        }
    }

    let previews_deleted = if params.previews { previews.clear().await? } else { 0 };

    tracing::info!(deleted = deleted_total, previews_deleted, "purged caches");

    json_result(&CachePurgeOutput { deleted: deleted_total, previews_deleted })
}
