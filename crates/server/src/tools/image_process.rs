//! image_process tool implementation.
//!
//! Normalizes a remote image into a PNG data URL, optionally removing its
//! background. Never fails on a bad image: the original URL comes back with
//! the reason it was kept.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use giftlist_client::{ImagePipeline, ProcessOutcome};
use giftlist_core::{BgSample, Error, ProcessOptions};

/// Parameters for the image_process tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageProcessParams {
    /// Absolute http(s) URL of the image.
    pub url: String,

    /// Remove the background (default: true).
    #[serde(default)]
    pub remove_bg: Option<bool>,

    /// Color distance treated as background, 0 to 441.67 (default: 35).
    #[serde(default)]
    pub bg_tolerance: Option<f64>,

    /// Where to sample the background: "corners" (default) or "border".
    #[serde(default)]
    pub bg_sample: Option<BgSample>,
}

/// Output from the image_process tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageProcessOutput {
    /// Displayable source: a PNG data URL, or the original URL on fallback.
    pub src: String,
    /// "cache_hit", "processed" or "fallback".
    pub outcome: String,
    /// Why the original URL was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl From<ProcessOutcome> for ImageProcessOutput {
    fn from(outcome: ProcessOutcome) -> Self {
        match outcome {
            ProcessOutcome::CacheHit(src) => Self { src, outcome: "cache_hit".into(), fallback_reason: None },
            ProcessOutcome::Processed(src) => Self { src, outcome: "processed".into(), fallback_reason: None },
            ProcessOutcome::Fallback { original, reason } => {
                Self { src: original, outcome: "fallback".into(), fallback_reason: Some(reason.to_string()) }
            }
        }
    }
}

/// Implementation of the image_process tool.
pub async fn process_impl(pipeline: &ImagePipeline, params: ImageProcessParams) -> Result<CallToolResult, McpError> {
    let url = params.url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()).into());
    }

    let options = ProcessOptions::from_parts(params.remove_bg, params.bg_tolerance, params.bg_sample);
    let outcome = pipeline.process_image_to_png(url, Some(options)).await;

    json_result(&ImageProcessOutput::from(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;
    use crate::tools::parse_output;

    fn params(url: &str) -> ImageProcessParams {
        ImageProcessParams { url: url.to_string(), remove_bg: None, bg_tolerance: None, bg_sample: None }
    }

    #[tokio::test]
    async fn test_process_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let state = testing::state(&dir).await;

        let first: ImageProcessOutput =
            parse_output(&process_impl(&state.pipeline, params("https://cdn.example/a.png")).await.unwrap());
        assert_eq!(first.outcome, "processed");
        assert!(first.src.starts_with("data:image/png;base64,"));

        let second: ImageProcessOutput =
            parse_output(&process_impl(&state.pipeline, params("https://cdn.example/a.png")).await.unwrap());
        assert_eq!(second.outcome, "cache_hit");
        assert_eq!(second.src, first.src);
    }

    #[tokio::test]
    async fn test_fallback_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let state = testing::state(&dir).await;

        let output: ImageProcessOutput =
            parse_output(&process_impl(&state.pipeline, params("https://cdn.example/broken.png")).await.unwrap());

        assert_eq!(output.outcome, "fallback");
        assert_eq!(output.src, "https://cdn.example/broken.png");
        assert!(output.fallback_reason.unwrap().starts_with("fetch failed"));
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = testing::state(&dir).await;

        assert!(process_impl(&state.pipeline, params("  ")).await.is_err());
    }
}
