//! Same-origin image relay.
//!
//! `GET /api/image-proxy?url=<target>` fetches the target server-side and
//! returns its bytes with permissive CORS, so browser-side pixel access is
//! never blocked by the target's cross-origin policy.
//!
//! | Condition                         | Status           | Body                      |
//! |-----------------------------------|------------------|---------------------------|
//! | `url` missing or unparsable       | 400              | `Invalid URL`             |
//! | scheme other than http(s)         | 400              | `Only http/https allowed` |
//! | target in a private range         | 403              | `Target not allowed`      |
//! | upstream 4xx/5xx                  | upstream status  | `Upstream fetch failed`   |
//! | other upstream non-2xx            | 502              | `Upstream fetch failed`   |
//! | upstream timeout                  | 504              | `Upstream timeout`        |
//! | anything else                     | 500              | `Proxy error`             |

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;

use giftlist_client::fetch::{UrlError, parse_http_url};
use giftlist_client::{FetchClient, FetchConfig};
use giftlist_core::{AppConfig, Error};

/// Path the relay is mounted on.
pub const PROXY_PATH: &str = "/api/image-proxy";

/// Browser cache lifetime for relayed images.
pub const CACHE_CONTROL: &str = "public, max-age=86400";

/// Relay failures, each mapped to a fixed status and plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Only http/https allowed")]
    UnsupportedScheme,

    #[error("Target not allowed")]
    Blocked,

    #[error("Upstream fetch failed")]
    Upstream(StatusCode),

    #[error("Upstream timeout")]
    Timeout,

    #[error("Proxy error")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidUrl | RelayError::UnsupportedScheme => StatusCode::BAD_REQUEST,
            RelayError::Blocked => StatusCode::FORBIDDEN,
            RelayError::Upstream(status) => *status,
            RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UrlError> for RelayError {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::UnsupportedScheme(_) => RelayError::UnsupportedScheme,
            UrlError::Empty | UrlError::InvalidUrl(_) => RelayError::InvalidUrl,
        }
    }
}

impl From<Error> for RelayError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidUrl(_) => RelayError::InvalidUrl,
            Error::SsrfBlocked(_) => RelayError::Blocked,
            Error::FetchTimeout(_) => RelayError::Timeout,
            Error::HttpError { status: Some(status), .. } => RelayError::Upstream(
                StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
            ),
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Internal(detail) => tracing::error!(detail, "relay request failed"),
            other => tracing::debug!(status = %other.status(), "relay request rejected"),
        }
        (self.status(), self.to_string()).into_response()
    }
}

#[derive(Clone)]
pub struct RelayState {
    fetch: Arc<FetchClient>,
}

impl RelayState {
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch: Arc::new(fetch) }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self::new(FetchClient::new(FetchConfig::from(config))?))
    }
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    #[serde(default)]
    url: String,
}

/// Relay routes. Every response carries `Access-Control-Allow-Origin: *`.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(PROXY_PATH, get(image_proxy))
        .route("/health", get(health))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

async fn allow_any_origin(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

async fn health() -> &'static str {
    "ok"
}

async fn image_proxy(State(state): State<RelayState>, Query(query): Query<ProxyQuery>) -> Result<Response, RelayError> {
    let target = parse_http_url(&query.url)?;

    let fetched = state.fetch.fetch(target.as_str()).await?;

    let content_type = fetched
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    tracing::info!(target = %target, bytes = fetched.bytes.len(), fetch_ms = fetched.fetch_ms, "relayed image");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL))],
        fetched.bytes,
    )
        .into_response())
}
