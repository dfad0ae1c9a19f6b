//! Core types and shared functionality for giftlist.
//!
//! This crate provides:
//! - Tiered cache for processed images (SQLite primary, key-value fallback)
//! - Link preview cache
//! - Gift registry repository with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod options;
pub mod registry;

pub use cache::{CacheBackend, ImageCache, KvStore, PreviewCache, PreviewEntry, StoreDb, TieredCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use options::{BgSample, ProcessOptions};
pub use registry::{Gift, NewGift, NewRsvp, RegistryRepository, Room, Rsvp};
