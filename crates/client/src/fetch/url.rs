//! URL validation and canonicalization for image targets and preview links.

/// Error type for URL validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse an absolute `http`/`https` URL.
///
/// Unlike [`canonicalize`], nothing is rewritten beyond what the URL parser
/// normalizes itself. Relative and scheme-less inputs are rejected.
pub fn parse_http_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl("missing host".into()));
    }

    Ok(parsed)
}

/// True when `input` is an absolute `http`/`https` URL.
pub fn is_http_url(input: &str) -> bool {
    parse_http_url(input).is_ok()
}

/// Canonicalize an image URL before it is relayed.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an absolute http(s) URL
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let mut parsed = parse_http_url(input)?;

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com/a.jpg").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CDN.Example.COM/A.jpg").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert_eq!(url.path(), "/A.jpg");
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://example.com/a.jpg?w=200&h=100#zoom").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("w=200&h=100"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  https://example.com/a.jpg  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a.jpg");
    }

    #[test]
    fn test_unsupported_schemes() {
        for input in ["file:///etc/passwd", "ftp://example.com/a.jpg", "data:image/png;base64,AAAA", "javascript:alert(1)"] {
            assert!(matches!(parse_http_url(input), Err(UrlError::UnsupportedScheme(_))), "{input}");
        }
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(parse_http_url(""), Err(UrlError::Empty));
        assert_eq!(parse_http_url("   "), Err(UrlError::Empty));
    }

    #[test]
    fn test_relative_rejected() {
        assert!(matches!(parse_http_url("/images/a.jpg"), Err(UrlError::InvalidUrl(_))));
        assert!(matches!(parse_http_url("example.com/a.jpg"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://example.com"));
        assert!(is_http_url("https://example.com/x?y=1"));
        assert!(!is_http_url("mailto:someone@example.com"));
        assert!(!is_http_url("not a url"));
    }
}
