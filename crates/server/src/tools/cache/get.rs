//! cache_get tool implementation.
//!
//! Retrieves the cached processed image for a source URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use giftlist_core::cache::ProcessedImage;
use giftlist_core::{Error, ImageCache};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Source URL the image was processed from.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cached entry.
    pub entry: ProcessedImage,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &ImageCache, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let entry = cache
        .entry(&params.url)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no processed image for {}", params.url)))?;

    json_result(&CacheGetOutput { entry })
}
