//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GIFTLIST_*)
//! 2. TOML config file (if GIFTLIST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GIFTLIST_*)
/// 2. TOML config file (if GIFTLIST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding processed images and registry tables.
    ///
    /// Set via GIFTLIST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory for the fallback key-value store (one JSON file per namespace).
    ///
    /// Set via GIFTLIST_KV_DIR environment variable.
    #[serde(default = "default_kv_dir")]
    pub kv_dir: PathBuf,

    /// Capacity of each key-value namespace in bytes.
    ///
    /// Set via GIFTLIST_KV_CAPACITY_BYTES environment variable.
    #[serde(default = "default_kv_capacity_bytes")]
    pub kv_capacity_bytes: usize,

    /// Processed payloads smaller than this are mirrored into the fallback store.
    ///
    /// Set via GIFTLIST_MIRROR_THRESHOLD_BYTES environment variable.
    #[serde(default = "default_mirror_threshold_bytes")]
    pub mirror_threshold_bytes: usize,

    /// Same-origin image relay endpoint.
    ///
    /// Set via GIFTLIST_RELAY_URL environment variable.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Link metadata service used for preview images.
    ///
    /// Set via GIFTLIST_PREVIEW_SERVICE_URL environment variable.
    #[serde(default = "default_preview_service_url")]
    pub preview_service_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via GIFTLIST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per image.
    ///
    /// Set via GIFTLIST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via GIFTLIST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Address the image relay listens on.
    ///
    /// Set via GIFTLIST_RELAY_BIND environment variable.
    #[serde(default = "default_relay_bind")]
    pub relay_bind: String,

    /// Let the relay fetch from private and loopback addresses.
    ///
    /// Set via GIFTLIST_ALLOW_PRIVATE_TARGETS environment variable.
    #[serde(default)]
    pub allow_private_targets: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./giftlist.sqlite")
}

fn default_kv_dir() -> PathBuf {
    PathBuf::from("./giftlist-kv")
}

fn default_kv_capacity_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_mirror_threshold_bytes() -> usize {
    500_000
}

fn default_relay_url() -> String {
    "http://localhost:5173/api/image-proxy".into()
}

fn default_preview_service_url() -> String {
    "https://api.microlink.io".into()
}

fn default_user_agent() -> String {
    "giftlist/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_relay_bind() -> String {
    "127.0.0.1:5173".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            kv_dir: default_kv_dir(),
            kv_capacity_bytes: default_kv_capacity_bytes(),
            mirror_threshold_bytes: default_mirror_threshold_bytes(),
            relay_url: default_relay_url(),
            preview_service_url: default_preview_service_url(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            relay_bind: default_relay_bind(),
            allow_private_targets: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GIFTLIST_`
    /// 2. TOML file from `GIFTLIST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GIFTLIST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("GIFTLIST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
