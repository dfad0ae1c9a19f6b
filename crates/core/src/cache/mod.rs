//! Persistent caches for processed images and link previews.
//!
//! - `StoreDb`: SQLite via tokio-rusqlite, the large-capacity primary store
//! - `KvStore`: small JSON-file key-value namespaces with a byte capacity
//! - `TieredCache`: backends tried in priority order, best-effort on both paths
//! - `ImageCache` / `PreviewCache`: the two namespaces the pipeline uses
//!
//! Entries are never revalidated. A processed image stays cached until the
//! store is purged.

pub mod connection;
pub mod hash;
pub mod images;
pub mod kv;
pub mod migrations;
pub mod preview;
pub mod tiered;

pub use crate::Error;

pub use connection::StoreDb;
pub use images::{ImageCache, PROCESSED_NAMESPACE, ProcessedImage};
pub use kv::KvStore;
pub use preview::{PREVIEW_NAMESPACE, PreviewCache, PreviewEntry};
pub use tiered::{CacheBackend, TieredCache};
