//! Shared services behind the MCP tools.
use std::sync::Arc;

use giftlist_client::{GalleryLoader, ImagePipeline, MicrolinkClient, MicrolinkConfig, PreviewResolver, RelayFetcher};
use giftlist_core::cache::{PREVIEW_NAMESPACE, PROCESSED_NAMESPACE};
use giftlist_core::{AppConfig, Error, ImageCache, KvStore, PreviewCache, StoreDb};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ImagePipeline,
    pub previews: Arc<PreviewResolver>,
    pub registry: StoreDb,
    pub gallery: Arc<GalleryLoader>,
}

impl AppState {
    pub fn new(pipeline: ImagePipeline, previews: Arc<PreviewResolver>, registry: StoreDb) -> Self {
        let gallery = Arc::new(GalleryLoader::new(pipeline.clone(), previews.clone()));
        Self { pipeline, previews, registry, gallery }
    }

    /// Open the stores named in `config` and wire up the relay and preview clients.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let db = StoreDb::open(&config.db_path).await?;

        let processed = KvStore::open(&config.kv_dir, PROCESSED_NAMESPACE, config.kv_capacity_bytes).await?;
        let cache = ImageCache::with_backends(db.clone(), processed, config.mirror_threshold_bytes);
        let pipeline = ImagePipeline::new(cache, Arc::new(RelayFetcher::from_config(config)?));

        let preview_store = KvStore::open(&config.kv_dir, PREVIEW_NAMESPACE, config.kv_capacity_bytes).await?;
        let service = MicrolinkClient::new(MicrolinkConfig::from(config)).map_err(|e| Error::http(e.to_string()))?;
        let previews = Arc::new(PreviewResolver::new(PreviewCache::new(preview_store), Arc::new(service)));

        tracing::info!(
            db = %config.db_path.display(),
            kv = %config.kv_dir.display(),
            relay = %config.relay_url,
            "opened giftlist stores"
        );

        Ok(Self::new(pipeline, previews, db))
    }
}
