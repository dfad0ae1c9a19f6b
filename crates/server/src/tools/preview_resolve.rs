//! preview_resolve tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use giftlist_client::{PreviewResolution, PreviewResolver};

/// Parameters for the preview_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewResolveParams {
    /// Outbound link (usually a store page).
    pub link: String,

    /// Image to use when the link has no cached resolution yet.
    #[serde(default)]
    pub fallback_image_url: Option<String>,
}

/// Output from the preview_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewResolveOutput {
    pub link: String,
    /// Preview image, `null` when there is none.
    pub image_url: Option<String>,
    /// Which step answered: "cache", "fallback", "service" or "none".
    pub resolution: String,
}

/// Implementation of the preview_resolve tool.
pub async fn resolve_impl(
    previews: &PreviewResolver, params: PreviewResolveParams,
) -> Result<CallToolResult, McpError> {
    let resolution = previews
        .resolve_detailed(&params.link, params.fallback_image_url.as_deref())
        .await;

    let step = match &resolution {
        PreviewResolution::Cached(_) => "cache",
        PreviewResolution::Fallback(_) => "fallback",
        PreviewResolution::Service(_) => "service",
        PreviewResolution::None => "none",
    };

    json_result(&PreviewResolveOutput {
        link: params.link,
        image_url: resolution.into_url(),
        resolution: step.to_string(),
    })
}
