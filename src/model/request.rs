use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Hard ceiling on fetch attempts for a link crawl
pub const MAX_LINK_REQUESTS: u32 = 100;

/// Fetch attempts granted per unit of `max_depth`
pub const REQUESTS_PER_DEPTH: u32 = 50;

/// Parallel fetches allowed in link mode
pub const LINK_CONCURRENCY: u32 = 5;

/// Default per-request time budget
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The extraction mode requested for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ExtractLinks,
    ExtractText,
    ExtractHtml,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractLinks => "extractLinks",
            Self::ExtractText => "extractText",
            Self::ExtractHtml => "extractHtml",
        }
    }

    /// Returns true for modes that produce exactly one page result
    pub fn is_single_page(&self) -> bool {
        !matches!(self, Self::ExtractLinks)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extractLinks" => Ok(Self::ExtractLinks),
            "extractText" => Ok(Self::ExtractText),
            "extractHtml" => Ok(Self::ExtractHtml),
            other => Err(CrawlError::Validation(format!(
                "Unknown operation '{}', expected extractLinks, extractText or extractHtml",
                other
            ))),
        }
    }
}

/// One validated crawl item. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    seed_url: Url,
    operation: Operation,
    max_depth: u32,
}

impl CrawlRequest {
    /// Validates caller input and builds a request
    ///
    /// `max_depth` is only meaningful for `ExtractLinks`; it defaults to 1 when
    /// absent and must be positive when given.
    ///
    /// # Errors
    ///
    /// `CrawlError::Validation` for an empty or unparsable URL, a non-HTTP(S)
    /// scheme, or a zero `max_depth` in link mode.
    pub fn new(url: &str, operation: Operation, max_depth: Option<u32>) -> Result<Self, CrawlError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CrawlError::Validation("URL is required".to_string()));
        }

        let seed_url = Url::parse(url)
            .map_err(|e| CrawlError::Validation(format!("Invalid URL '{}': {}", url, e)))?;

        if seed_url.scheme() != "http" && seed_url.scheme() != "https" {
            return Err(CrawlError::Validation(format!(
                "URL '{}' must use http or https, got {}",
                url,
                seed_url.scheme()
            )));
        }

        let max_depth = match operation {
            Operation::ExtractLinks => match max_depth.unwrap_or(1) {
                0 => {
                    return Err(CrawlError::Validation(
                        "maxDepth must be a positive integer".to_string(),
                    ))
                }
                depth => depth,
            },
            Operation::ExtractText | Operation::ExtractHtml => 1,
        };

        Ok(Self {
            seed_url,
            operation,
            max_depth,
        })
    }

    pub fn seed_url(&self) -> &Url {
        &self.seed_url
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

/// Dispatcher limits for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Ceiling on fetch attempts, retries included
    pub max_total_requests: u32,

    /// Ceiling on fetches in flight at once
    pub max_concurrency: u32,

    /// Budget for connect + transfer + handler of a single fetch
    pub per_request_timeout: Duration,
}

impl FetchLimits {
    /// Derives limits from a request
    ///
    /// | Operation | max_total_requests | max_concurrency |
    /// |-----------|--------------------|-----------------|
    /// | ExtractLinks | min(100, max_depth × 50) | 5 |
    /// | ExtractText / ExtractHtml | 1 | 1 |
    pub fn for_request(request: &CrawlRequest, per_request_timeout: Duration) -> Self {
        match request.operation() {
            Operation::ExtractLinks => Self {
                max_total_requests: request
                    .max_depth()
                    .saturating_mul(REQUESTS_PER_DEPTH)
                    .clamp(1, MAX_LINK_REQUESTS),
                max_concurrency: LINK_CONCURRENCY,
                per_request_timeout,
            },
            Operation::ExtractText | Operation::ExtractHtml => Self {
                max_total_requests: 1,
                max_concurrency: 1,
                per_request_timeout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(depth: u32) -> CrawlRequest {
        CrawlRequest::new("https://example.com/", Operation::ExtractLinks, Some(depth)).unwrap()
    }

    #[test]
    fn test_link_budget_scales_with_depth() {
        let limits = FetchLimits::for_request(&links(1), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(limits.max_total_requests, 50);
        assert_eq!(limits.max_concurrency, 5);

        let limits = FetchLimits::for_request(&links(2), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(limits.max_total_requests, 100);
    }

    #[test]
    fn test_link_budget_is_capped() {
        for depth in [3, 10, u32::MAX] {
            let limits = FetchLimits::for_request(&links(depth), DEFAULT_REQUEST_TIMEOUT);
            assert_eq!(limits.max_total_requests, 100, "depth {}", depth);
        }
    }

    #[test]
    fn test_single_page_limits() {
        for op in [Operation::ExtractText, Operation::ExtractHtml] {
            let request = CrawlRequest::new("https://example.com/", op, Some(7)).unwrap();
            let limits = FetchLimits::for_request(&request, DEFAULT_REQUEST_TIMEOUT);
            assert_eq!(limits.max_total_requests, 1);
            assert_eq!(limits.max_concurrency, 1);
            assert_eq!(limits.per_request_timeout, Duration::from_secs(30));
        }
    }

    #[test]
    fn test_missing_depth_defaults_to_one() {
        let request = CrawlRequest::new("https://example.com/", Operation::ExtractLinks, None).unwrap();
        assert_eq!(request.max_depth(), 1);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let result = CrawlRequest::new("https://example.com/", Operation::ExtractLinks, Some(0));
        assert!(matches!(result, Err(CrawlError::Validation(_))));
    }

    #[test]
    fn test_empty_url_rejected() {
        for url in ["", "   "] {
            let result = CrawlRequest::new(url, Operation::ExtractText, None);
            assert!(matches!(result, Err(CrawlError::Validation(_))));
        }
    }

    #[test]
    fn test_non_http_url_rejected() {
        let result = CrawlRequest::new("ftp://example.com/file", Operation::ExtractHtml, None);
        assert!(matches!(result, Err(CrawlError::Validation(_))));

        let result = CrawlRequest::new("not a url", Operation::ExtractHtml, None);
        assert!(matches!(result, Err(CrawlError::Validation(_))));
    }

    #[test]
    fn test_operation_round_trips_through_str() {
        assert_eq!("extractText".parse::<Operation>().unwrap(), Operation::ExtractText);
        assert_eq!(Operation::ExtractLinks.to_string(), "extractLinks");
        assert!("extractImages".parse::<Operation>().is_err());
    }
}
