//! MCP tool implementations.
//!
//! Each tool takes typed parameters and answers with pretty-printed JSON text.

pub mod cache;
pub mod image_process;
pub mod preview_resolve;
pub mod registry;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use giftlist_core::Error;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use image_process::ImageProcessParams;
pub use preview_resolve::PreviewResolveParams;
pub use registry::{GiftMarkPurchasedParams, GiftsImportParams, GiftsListParams, RsvpListParams, RsvpSubmitParams};

/// Serialize `output` as the tool's text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn parse_output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
