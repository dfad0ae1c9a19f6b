//! Client side of giftlist image handling.
//!
//! Fetching (upstream and through the relay), raster processing, the
//! `process_image_to_png` pipeline, link previews and gallery loading.

pub mod fetch;
pub mod gallery;
pub mod imaging;
pub mod pipeline;
pub mod preview;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, FetchedImage, ImageFetcher, RelayFetcher};
pub use gallery::{GalleryImage, GalleryLoader, display_source};
pub use pipeline::{FallbackReason, Generation, ImagePipeline, ProcessOutcome, Ticket};
pub use preview::{MetadataService, MicrolinkClient, MicrolinkConfig, PreviewError, PreviewResolution, PreviewResolver};
