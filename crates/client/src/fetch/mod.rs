//! Image fetching.
//!
//! Two sides of the same request:
//! - [`FetchClient`] talks to arbitrary upstream hosts. The relay uses it.
//! - [`RelayFetcher`] asks the same-origin relay for a target URL. The image
//!   pipeline uses it through the [`ImageFetcher`] trait.
//!
//! ### Safety Gates (upstream side)
//! - Only absolute http(s) URLs
//! - Deny private ranges (RFC1918, link-local, localhost, etc.)
//! - Resolve DNS and validate all A/AAAA answers are public
//! - Redirects are limited and may not hop to IP literals in private ranges
//! - Max body bytes (configurable), enforced while the body streams in

pub mod relay;
pub mod ssrf;
pub mod url;

use bytes::{Bytes, BytesMut};
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use relay::{FetchedImage, ImageFetcher, RelayFetcher};
pub use ssrf::{SsrfError, resolve_public, validate_ip};
pub use url::{UrlError, canonicalize, is_http_url, parse_http_url};

use giftlist_core::{AppConfig, Error};

/// Accept header sent for image requests.
pub const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/png,image/jpeg,image/*;q=0.8,*/*;q=0.5";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "giftlist/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Skip the private-address checks (default: false)
    pub allow_private_targets: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "giftlist/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            allow_private_targets: false,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            allow_private_targets: config.allow_private_targets,
            ..Self::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP fetch client with safety checks.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect_policy(config.max_redirects, config.allow_private_targets))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Performs the SSRF check and respects redirect/byte limits. A non-2xx
    /// upstream answer is an [`Error::HttpError`] carrying that status.
    pub async fn fetch(&self, url_str: &str) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if !self.config.allow_private_targets {
            resolve_public(&url).await.map_err(|e| Error::SsrfBlocked(e.to_string()))?;
        }

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError {
                status: Some(status.as_u16()),
                message: format!("upstream status {}", status.as_u16()),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = read_limited(response, self.config.max_bytes).await?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchResponse { url, final_url, status, content_type, bytes, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn redirect_policy(max_redirects: usize, allow_private: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error("too many redirects");
        }
        if !matches!(attempt.url().scheme(), "http" | "https") {
            return attempt.stop();
        }
        if !allow_private && let Err(e) = ssrf::validate_host_literal(attempt.url()) {
            return attempt.error(e);
        }
        attempt.follow()
    })
}

/// Read a response body chunk by chunk, failing with [`Error::FetchTooLarge`]
/// as soon as it grows past `max_bytes`.
pub(crate) async fn read_limited(mut response: reqwest::Response, max_bytes: usize) -> Result<Bytes, Error> {
    if let Some(len) = response.content_length()
        && len > max_bytes as u64
    {
        return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, max_bytes)));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(map_send_error)? {
        if body.len() + chunk.len() > max_bytes {
            return Err(Error::FetchTooLarge(format!("body exceeds {} bytes", max_bytes)));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}

pub(crate) fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(e.to_string())
    } else {
        Error::http(format!("network error: {}", e))
    }
}
