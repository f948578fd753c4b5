use chrono::Utc;
use url::Url;

/// Query parameter carrying the uniqueness token
pub const CACHE_BUST_PARAM: &str = "_t";

/// Appends a uniqueness token to defeat intermediate response caches
///
/// Existing query parameters are kept; the token is appended last.
pub fn cache_bust(url: &Url, token: i64) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &token.to_string());
    busted
}

/// Appends the current Unix time in milliseconds as the uniqueness token
pub fn cache_bust_now(url: &Url) -> Url {
    cache_bust(url, Utc::now().timestamp_millis())
}

/// Removes the uniqueness token again, e.g. from a post-redirect URL
///
/// Only the last `_t=<token>` segment is dropped; the rest of the query is
/// kept byte for byte, including an `_t` the URL carried before busting.
pub fn strip_cache_buster(url: &Url) -> Url {
    let Some(query) = url.query() else {
        return url.clone();
    };

    let mut segments: Vec<&str> = query.split('&').collect();
    let Some(position) = segments.iter().rposition(|segment| is_token_segment(segment)) else {
        return url.clone();
    };
    segments.remove(position);

    let mut stripped = url.clone();
    if segments.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.set_query(Some(&segments.join("&")));
    }
    stripped
}

fn is_token_segment(segment: &str) -> bool {
    segment
        .strip_prefix(CACHE_BUST_PARAM)
        .and_then(|rest| rest.strip_prefix('='))
        .map_or(false, |token| {
            token.strip_prefix('-').unwrap_or(token).bytes().all(|b| b.is_ascii_digit())
                && !token.is_empty()
        })
}
