//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::{
    CacheGetParams, CachePurgeParams, GiftMarkPurchasedParams, GiftsImportParams, GiftsListParams,
    ImageProcessParams, PreviewResolveParams, RsvpListParams, RsvpSubmitParams, cache, image_process, preview_resolve,
    registry,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for giftlist.
#[derive(Clone)]
pub struct GiftlistServer {
    state: AppState,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl GiftlistServer {
    /// Create a new server handler.
    pub fn new(state: AppState) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Normalize a remote product image into a PNG data URL, optionally removing a flat background. Falls back to the original URL when the image cannot be processed."
    )]
    async fn image_process(&self, params: Parameters<ImageProcessParams>) -> Result<CallToolResult, McpError> {
        image_process::process_impl(&self.state.pipeline, params.0).await
    }

    #[tool(
        description = "Find a preview image for an outbound link: cached result, then the given fallback image, then the link metadata service. A link that resolves to nothing stays resolved to none."
    )]
    async fn preview_resolve(&self, params: Parameters<PreviewResolveParams>) -> Result<CallToolResult, McpError> {
        preview_resolve::resolve_impl(&self.state.previews, params.0).await
    }

    #[tool(description = "Get the cached processed image for a source URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(self.state.pipeline.cache(), params.0).await
    }

    #[tool(
        description = "Purge processed images by domain, keep only the newest N, or drop everything. Set previews to forget resolved link previews."
    )]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(self.state.pipeline.cache(), self.state.previews.cache(), params.0).await
    }

    #[tool(
        description = "List gifts, optionally for one room, with their purchase state. Set resolve_images to attach each gift's display image."
    )]
    async fn gifts_list(&self, params: Parameters<GiftsListParams>) -> Result<CallToolResult, McpError> {
        registry::list_impl(&self.state.registry, &self.state.gallery, params.0).await
    }

    #[tool(description = "Mark a gift as purchased, or clear the mark.")]
    async fn gift_mark_purchased(&self, params: Parameters<GiftMarkPurchasedParams>) -> Result<CallToolResult, McpError> {
        registry::mark_impl(&self.state.registry, params.0).await
    }

    #[tool(description = "Insert or update gifts from a JSON array of rows.")]
    async fn gifts_import(&self, params: Parameters<GiftsImportParams>) -> Result<CallToolResult, McpError> {
        registry::import_impl(&self.state.registry, params.0).await
    }

    #[tool(description = "Record an RSVP.")]
    async fn rsvp_submit(&self, params: Parameters<RsvpSubmitParams>) -> Result<CallToolResult, McpError> {
        registry::submit_impl(&self.state.registry, params.0).await
    }

    #[tool(description = "List RSVPs, newest first.")]
    async fn rsvp_list(&self, params: Parameters<RsvpListParams>) -> Result<CallToolResult, McpError> {
        registry::rsvp_list_impl(&self.state.registry, params.0).await
    }
}

impl ServerHandler for GiftlistServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "giftlist".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
