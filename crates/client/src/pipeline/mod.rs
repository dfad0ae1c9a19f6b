//! `process_image_to_png`: turn a remote image URL into a displayable PNG.
//!
//! 1. Cached payload for the URL, if any
//! 2. Fetch through the relay
//! 3. Decode
//! 4. Optionally remove the background
//! 5. Encode as a PNG data URL and cache it
//!
//! Every failure after step 1 degrades to the original URL. The caller always
//! gets something it can display.

pub mod guard;

use std::sync::Arc;

use bytes::Bytes;
use image::RgbaImage;

pub use guard::{Generation, Ticket};

use crate::fetch::ImageFetcher;
use crate::imaging::{self, remove_background, sample_background};
use giftlist_core::{Error, ImageCache, ProcessOptions};

/// Why processing fell back to the original URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FallbackReason {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("encode failed: {0}")]
    Encode(String),
}

/// Result of [`ImagePipeline::process_image_to_png`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Payload served from the cache without touching the network.
    CacheHit(String),
    /// Freshly processed PNG data URL. Also written to the cache.
    Processed(String),
    /// The original URL, returned unchanged.
    Fallback { original: String, reason: FallbackReason },
}

impl ProcessOutcome {
    /// The displayable source, whatever the outcome.
    pub fn src(&self) -> &str {
        match self {
            ProcessOutcome::CacheHit(src) | ProcessOutcome::Processed(src) => src,
            ProcessOutcome::Fallback { original, .. } => original,
        }
    }

    pub fn into_src(self) -> String {
        match self {
            ProcessOutcome::CacheHit(src) | ProcessOutcome::Processed(src) => src,
            ProcessOutcome::Fallback { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ProcessOutcome::Fallback { .. })
    }
}

/// Image normalization pipeline. Cheap to clone.
#[derive(Clone)]
pub struct ImagePipeline {
    cache: ImageCache,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ImagePipeline {
    pub fn new(cache: ImageCache, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Normalize the image at `url` into a PNG data URL.
    ///
    /// The cache is keyed by URL alone: a URL processed once is served from
    /// the cache regardless of the options passed later.
    #[tracing::instrument(skip(self, options))]
    pub async fn process_image_to_png(&self, url: &str, options: Option<ProcessOptions>) -> ProcessOutcome {
        let options = options.unwrap_or_default();

        if let Some(cached) = self.cache.get(url).await {
            tracing::debug!("processed image cache hit");
            return ProcessOutcome::CacheHit(cached);
        }

        let fallback = |reason: FallbackReason| {
            tracing::warn!(reason = %reason, "image processing fell back to original URL");
            ProcessOutcome::Fallback { original: url.to_string(), reason }
        };

        let fetched = match self.fetcher.fetch(url).await {
            Ok(fetched) => fetched,
            Err(e) => return fallback(FallbackReason::Fetch(e.to_string())),
        };

        let image = match decode_blocking(fetched.bytes).await {
            Ok(image) => image,
            Err(reason) => return fallback(reason),
        };

        let payload = match render_blocking(image, options).await {
            Ok(payload) => payload,
            Err(reason) => return fallback(reason),
        };

        self.cache.set(url, &payload).await;
        tracing::debug!(bytes = payload.len(), remove_bg = options.remove_bg, "processed image");

        ProcessOutcome::Processed(payload)
    }
}

async fn decode_blocking(bytes: Bytes) -> Result<RgbaImage, FallbackReason> {
    let image = tokio::task::spawn_blocking(move || imaging::decode(&bytes))
        .await
        .map_err(|e| FallbackReason::Decode(format!("decode task panicked: {e}")))?
        .map_err(|e| FallbackReason::Decode(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(FallbackReason::EmptyImage);
    }

    Ok(image)
}

async fn render_blocking(image: RgbaImage, options: ProcessOptions) -> Result<String, FallbackReason> {
    tokio::task::spawn_blocking(move || render(image, options))
        .await
        .map_err(|e| FallbackReason::Encode(format!("encode task panicked: {e}")))?
}

fn render(mut image: RgbaImage, options: ProcessOptions) -> Result<String, FallbackReason> {
    if options.remove_bg {
        let background = sample_background(&image, options.bg_sample).ok_or(FallbackReason::EmptyImage)?;
        let changed = remove_background(&mut image, background, options.bg_tolerance);
        tracing::trace!(?background, changed, "removed background");
    }

    imaging::encode_png_data_url(&image).map_err(|e: Error| FallbackReason::Encode(e.to_string()))
}
