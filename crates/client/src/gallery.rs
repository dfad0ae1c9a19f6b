//! Resolving display images for a list of gifts.
//!
//! A gift's own image is normalized through the pipeline. Gifts without a
//! usable image fall back to a preview of their store link.
use std::sync::Arc;

use serde::Serialize;

use crate::fetch::is_http_url;
use crate::pipeline::{ImagePipeline, ProcessOutcome, Ticket};
use crate::preview::PreviewResolver;
use giftlist_core::Gift;

/// `raw` trimmed, if it is something an `<img>` can load: an http(s), `data:`
/// or `blob:` URL.
pub fn display_source(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    ["http://", "https://", "data:", "blob:"]
        .iter()
        .any(|prefix| trimmed.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)))
        .then_some(trimmed)
}

/// Display image for one gift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub gift_id: i64,
    /// `None` when no image could be found at all.
    pub src: Option<String>,
    /// True when `src` came out of the image pipeline rather than being passed through.
    pub processed: bool,
}

pub struct GalleryLoader {
    pipeline: ImagePipeline,
    previews: Arc<PreviewResolver>,
}

impl GalleryLoader {
    pub fn new(pipeline: ImagePipeline, previews: Arc<PreviewResolver>) -> Self {
        Self { pipeline, previews }
    }

    /// Resolve the display image of a single gift.
    pub async fn image_for(&self, gift: &Gift) -> GalleryImage {
        let source = match display_source(&gift.image_url) {
            Some(source) => Some(source.to_string()),
            None if !gift.store_link.trim().is_empty() => {
                self.previews.resolve_preview_image(gift.store_link.trim(), None).await
            }
            None => None,
        };

        match source {
            Some(url) if is_http_url(&url) => {
                let outcome = self.pipeline.process_image_to_png(&url, Some(gift.process_options())).await;
                let processed = !matches!(outcome, ProcessOutcome::Fallback { .. });
                GalleryImage { gift_id: gift.id, src: Some(outcome.into_src()), processed }
            }
            src => GalleryImage { gift_id: gift.id, src, processed: false },
        }
    }

    /// Resolve images for `gifts` in order.
    ///
    /// Returns `None` as soon as `ticket` goes stale; whatever was resolved
    /// so far is discarded.
    pub async fn load(&self, gifts: &[Gift], ticket: &Ticket) -> Option<Vec<GalleryImage>> {
        let mut images = Vec::with_capacity(gifts.len());

        for gift in gifts {
            let image = self.image_for(gift).await;
            images.push(ticket.apply(image)?);
        }

        Some(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use giftlist_core::cache::{PREVIEW_NAMESPACE, PROCESSED_NAMESPACE};
    use giftlist_core::{Error, ImageCache, KvStore, PreviewCache, Room, StoreDb};
    use image::{Rgba, RgbaImage};

    use crate::fetch::{FetchedImage, ImageFetcher};
    use crate::imaging;
    use crate::pipeline::Generation;
    use crate::preview::{MetadataService, PreviewError};

    struct PngFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageFetcher for PngFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedImage, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let png = imaging::encode_png(&RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255])))?;
            Ok(FetchedImage { bytes: Bytes::from(png), content_type: Some("image/png".into()) })
        }
    }

    struct FixedService;

    #[async_trait]
    impl MetadataService for FixedService {
        async fn preview_image(&self, _link: &str) -> Result<Option<String>, PreviewError> {
            Ok(Some("https://shop.example/preview.jpg".into()))
        }
    }

    async fn loader(dir: &tempfile::TempDir) -> (GalleryLoader, Arc<PngFetcher>) {
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), PROCESSED_NAMESPACE, 1024 * 1024).await.unwrap();
        let fetcher = Arc::new(PngFetcher { calls: AtomicUsize::new(0) });
        let pipeline = ImagePipeline::new(ImageCache::with_backends(db, kv, 500_000), fetcher.clone());

        let store = KvStore::open(dir.path(), PREVIEW_NAMESPACE, 64 * 1024).await.unwrap();
        let previews = Arc::new(PreviewResolver::new(PreviewCache::new(store), Arc::new(FixedService)));

        (GalleryLoader::new(pipeline, previews), fetcher)
    }

    fn gift(id: i64, image_url: &str, store_link: &str) -> Gift {
        Gift {
            id,
            name: format!("gift {id}"),
            image_url: image_url.into(),
            store_link: store_link.into(),
            room: Room::Kitchen,
            remove_bg: Some(false),
            bg_tolerance: None,
            bg_sample: None,
        }
    }

    #[test]
    fn test_display_source() {
        assert_eq!(display_source("  https://a.example/x.jpg "), Some("https://a.example/x.jpg"));
        assert_eq!(display_source("HTTP://A.EXAMPLE/x.jpg"), Some("HTTP://A.EXAMPLE/x.jpg"));
        assert_eq!(display_source("data:image/png;base64,AAAA"), Some("data:image/png;base64,AAAA"));
        assert_eq!(display_source("blob:https://a.example/123"), Some("blob:https://a.example/123"));
        assert_eq!(display_source("javascript:alert(1)"), None);
        assert_eq!(display_source("/img/local.png"), None);
        assert_eq!(display_source("   "), None);
    }

    #[tokio::test]
    async fn test_own_image_is_processed() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, fetcher) = loader(&dir).await;

        let image = loader.image_for(&gift(1, "https://cdn.example/pan.jpg", "")).await;

        assert!(image.processed);
        assert!(image.src.unwrap().starts_with(imaging::PNG_DATA_URL_PREFIX));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_data_url_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, fetcher) = loader(&dir).await;

        let image = loader.image_for(&gift(2, "data:image/png;base64,AAAA", "")).await;

        assert_eq!(image.src.as_deref(), Some("data:image/png;base64,AAAA"));
        assert!(!image.processed);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_image_uses_store_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = loader(&dir).await;

        let image = loader.image_for(&gift(3, "", "https://shop.example/item/3")).await;

        assert!(image.processed);
        assert!(image.src.is_some());
    }

    #[tokio::test]
    async fn test_nothing_to_show() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = loader(&dir).await;

        let image = loader.image_for(&gift(4, "not a url", "")).await;

        assert_eq!(image, GalleryImage { gift_id: 4, src: None, processed: false });
    }

    #[tokio::test]
    async fn test_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = loader(&dir).await;
        let gifts = [gift(1, "https://cdn.example/a.jpg", ""), gift(2, "", "")];

        let images = loader.load(&gifts, &Generation::new().ticket()).await.unwrap();

        assert_eq!(images.iter().map(|i| i.gift_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_with_stale_ticket_discards_results() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _) = loader(&dir).await;
        let generation = Generation::new();
        let ticket = generation.ticket();
        generation.advance();

        let images = loader.load(&[gift(1, "https://cdn.example/a.jpg", "")], &ticket).await;

        assert_eq!(images, None);
    }
}
