//! Version-tagged cache key derivation.

use sha2::{Digest, Sha256};

/// Version tag for processed-image keys. Bump when the pipeline output changes.
pub const IMAGE_KEY_VERSION: &str = "v1";

/// Compute a cache key for a source URL under a version tag.
///
/// The result is `"<version>:<sha256 hex of source>"`, so payloads written by an
/// older pipeline never collide with a newer one.
pub fn cache_key(version: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{version}:{}", hex::encode(hasher.finalize()))
}

/// Key for a processed image.
pub fn image_key(url: &str) -> String {
    cache_key(IMAGE_KEY_VERSION, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = image_key("https://example.com/a.jpg");
        let key2 = image_key("https://example.com/a.jpg");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_different_version() {
        let v1 = cache_key("v1", "https://example.com/a.jpg");
        let v2 = cache_key("v2", "https://example.com/a.jpg");
        assert_ne!(v1, v2);
        assert_eq!(v1[3..], v2[3..]);
    }

    #[test]
    fn test_key_different_url() {
        assert_ne!(image_key("https://example.com/a.jpg"), image_key("https://example.com/b.jpg"));
    }

    #[test]
    fn test_key_format() {
        let key = image_key("https://example.com/a.jpg");
        let (version, digest) = key.split_once(':').unwrap();
        assert_eq!(version, "v1");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
