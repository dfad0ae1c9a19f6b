//! Fetching images through the same-origin relay.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};

use super::url::canonicalize;
use super::{IMAGE_ACCEPT, map_send_error, read_limited};
use giftlist_core::{AppConfig, Error};

/// Raw image bytes as returned by a fetcher.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Source of raw image bytes for the processing pipeline.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the image at `url`. Any failure is reported as an error; the
    /// caller decides what to fall back to.
    async fn fetch(&self, url: &str) -> Result<FetchedImage, Error>;
}

/// Fetches target images via `GET <relay>?url=<encoded target>`.
///
/// Bodies larger than the configured `max_bytes` are rejected while streaming.
#[derive(Debug, Clone)]
pub struct RelayFetcher {
    http: Client,
    relay: url::Url,
    max_bytes: usize,
}

impl RelayFetcher {
    pub fn new(relay_url: &str, config: &AppConfig) -> Result<Self, Error> {
        let relay = url::Url::parse(relay_url).map_err(|e| Error::InvalidUrl(format!("relay URL: {e}")))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, relay, max_bytes: config.max_bytes })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.relay_url, config)
    }

    /// Relay request URL for `target`, with the target percent-encoded.
    pub fn request_url(&self, target: &url::Url) -> url::Url {
        let mut url = self.relay.clone();
        url.query_pairs_mut().append_pair("url", target.as_str());
        url
    }
}

#[async_trait]
impl ImageFetcher for RelayFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, Error> {
        let target = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request_url = self.request_url(&target);

        let response = self
            .http
            .get(request_url)
            .header(header::ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError {
                status: Some(status.as_u16()),
                message: format!("relay status {} for {}", status.as_u16(), target),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = read_limited(response, self.max_bytes).await?;

        Ok(FetchedImage { bytes, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::collections::HashMap;

    use crate::pipeline::{FallbackReason, ImagePipeline, ProcessOutcome};
    use giftlist_core::cache::PROCESSED_NAMESPACE;
    use giftlist_core::{ImageCache, KvStore, StoreDb};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn test_request_url_encodes_target() {
        let fetcher = RelayFetcher::new("http://localhost:5173/api/image-proxy", &AppConfig::default()).unwrap();
        let target = url::Url::parse("https://cdn.example.com/a b.jpg?w=1&h=2").unwrap();

        let url = fetcher.request_url(&target);

        assert_eq!(url.path(), "/api/image-proxy");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "url");
        assert_eq!(value, target.as_str());
        assert!(!url.query().unwrap().contains('&'), "target query must be encoded");
    }

    #[test]
    fn test_new_rejects_bad_relay_url() {
        assert!(matches!(RelayFetcher::new("not a url", &AppConfig::default()), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_passes_target_to_relay() {
        let router = Router::new().route(
            "/api/image-proxy",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("url").map(String::as_str) {
                    Some("https://cdn.example.com/a.png") => (StatusCode::OK, vec![7u8, 8, 9]),
                    _ => (StatusCode::BAD_REQUEST, Vec::new()),
                }
            }),
        );
        let base = spawn(router).await;

        let fetcher = RelayFetcher::new(&format!("{base}/api/image-proxy"), &AppConfig::default()).unwrap();
        let image = fetcher.fetch("https://cdn.example.com/a.png#frag").await.unwrap();

        assert_eq!(image.bytes.as_ref(), &[7, 8, 9]);
    }

    #[tokio::test]
    async fn test_fetch_reports_relay_status() {
        let router = Router::new().route("/api/image-proxy", get(|| async { StatusCode::BAD_GATEWAY }));
        let base = spawn(router).await;

        let fetcher = RelayFetcher::new(&format!("{base}/api/image-proxy"), &AppConfig::default()).unwrap();
        let err = fetcher.fetch("https://cdn.example.com/a.png").await.unwrap_err();

        assert!(matches!(err, Error::HttpError { status: Some(502), .. }));
    }

    fn endless_relay() -> Router {
        Router::new().route(
            "/api/image-proxy",
            get(|| async {
                let chunks =
                    futures_util::stream::repeat_with(|| Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 64 * 1024])));
                axum::body::Body::from_stream(chunks)
            }),
        )
    }

    #[tokio::test]
    async fn test_fetch_caps_relay_body() {
        let base = spawn(endless_relay()).await;
        let config = AppConfig { max_bytes: 1024, ..AppConfig::default() };

        let fetcher = RelayFetcher::new(&format!("{base}/api/image-proxy"), &config).unwrap();
        let err = fetcher.fetch("https://cdn.example.com/a.png").await.unwrap_err();

        assert!(matches!(err, Error::FetchTooLarge(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_oversized_relay_body_falls_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let db = StoreDb::open_in_memory().await.unwrap();
        let kv = KvStore::open(dir.path(), PROCESSED_NAMESPACE, 1024 * 1024).await.unwrap();
        let base = spawn(endless_relay()).await;
        let config = AppConfig { max_bytes: 1024, ..AppConfig::default() };
        let fetcher = RelayFetcher::new(&format!("{base}/api/image-proxy"), &config).unwrap();
        let pipeline = ImagePipeline::new(ImageCache::with_backends(db, kv, 500_000), std::sync::Arc::new(fetcher));

        let outcome = pipeline.process_image_to_png("https://cdn.example.com/a.png", None).await;

        let ProcessOutcome::Fallback { original, reason: FallbackReason::Fetch(_) } = outcome else {
            panic!("expected fetch fallback, got {outcome:?}");
        };
        assert_eq!(original, "https://cdn.example.com/a.png");
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_target_without_request() {
        let fetcher = RelayFetcher::new("http://127.0.0.1:9/api/image-proxy", &AppConfig::default()).unwrap();
        assert!(matches!(fetcher.fetch("ftp://x/a.png").await, Err(Error::InvalidUrl(_))));
    }
}
