//! Microlink metadata API client.
//!
//! `GET <base>?url=<link>` returns page metadata; the preview image is
//! `data.image.url`, else `data.logo.url`.

use async_trait::async_trait;
use reqwest::header;
use std::time::{Duration, Instant};

use super::MetadataService;
use super::error::PreviewError;
use super::response::MicrolinkResponse;
use giftlist_core::AppConfig;

/// Default base URL for the Microlink API.
const DEFAULT_BASE_URL: &str = "https://api.microlink.io";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "giftlist/0.1";

/// Microlink client configuration.
#[derive(Debug, Clone)]
pub struct MicrolinkConfig {
    /// Base URL (default: https://api.microlink.io).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: giftlist/0.x).
    pub user_agent: String,
}

impl Default for MicrolinkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&AppConfig> for MicrolinkConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.preview_service_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Microlink API client.
#[derive(Debug, Clone)]
pub struct MicrolinkClient {
    http: reqwest::Client,
    config: MicrolinkConfig,
}

impl MicrolinkClient {
    pub fn new(config: MicrolinkConfig) -> Result<Self, PreviewError> {
        let http = reqwest::Client::builder().timeout(config.timeout).use_rustls_tls().build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &MicrolinkConfig {
        &self.config
    }
}

#[async_trait]
impl MetadataService for MicrolinkClient {
    async fn preview_image(&self, link: &str) -> Result<Option<String>, PreviewError> {
        let start = Instant::now();

        let http_response = self
            .http
            .get(&self.config.base_url)
            .query(&[("url", link)])
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(PreviewError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let response: MicrolinkResponse =
            serde_json::from_slice(&bytes).map_err(|e| PreviewError::Parse(e.to_string()))?;

        let image = response.preview_image();
        tracing::debug!(link, found = image.is_some(), "microlink lookup in {:?}", start.elapsed());

        Ok(image)
    }
}
