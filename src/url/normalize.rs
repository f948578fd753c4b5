use crate::UrlError;
use url::Url;

/// Resolves an href found on a page into an absolute HTTP(S) URL
///
/// # Resolution Rules
///
/// 1. Trim surrounding whitespace; reject if empty
/// 2. Reject broken percent-encoding (`%` not followed by two hex digits)
/// 3. Resolve against `base` per WHATWG URL rules:
///    - absolute hrefs pass through
///    - scheme-relative (`//host/x`), path-relative and fragment-only hrefs
///      are resolved against `base`
/// 4. Reject anything that is not `http` or `https` after resolution
///    (`mailto:`, `javascript:`, `tel:`, `data:`, ...)
///
/// Callers skip hrefs that fail here; a bad link never aborts a crawl.
///
/// # Examples
///
/// ```
/// use seedcrawl::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://x.test/").unwrap();
/// assert_eq!(normalize(&base, "/a").unwrap().as_str(), "https://x.test/a");
/// assert!(normalize(&base, "%%%").is_err());
/// ```
pub fn normalize(base: &Url, href: &str) -> Result<Url, UrlError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    if has_broken_percent_encoding(href) {
        return Err(UrlError::Malformed(format!(
            "invalid percent-encoding in '{}'",
            href
        )));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    match resolved.scheme() {
        "http" | "https" => Ok(resolved),
        other => Err(UrlError::UnsupportedScheme(other.to_string())),
    }
}

/// Checks for `%` not followed by two hex digits
fn has_broken_percent_encoding(href: &str) -> bool {
    let bytes = href.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(h), Some(l)) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit()
            )
    })
}
