//! Seedcrawl: a bounded crawl and single-page extraction engine
//!
//! Given a seed URL and an operation, this crate fetches the page under a
//! concurrency and request-volume ceiling and produces one normalized result:
//! deduplicated outbound links, visible text, or raw markup.

pub mod batch;
pub mod config;
pub mod crawler;
pub mod model;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Item-level error for one crawl request
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("Crawl failed: {0}")]
    Failed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crawler::SessionState,
        to: crawler::SessionState,
    },
}

/// Errors raised while fetching a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url} after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Fetch backend has been torn down")]
    Closed,

    #[error("Fetch backend error: {0}")]
    Backend(String),
}

impl FetchError {
    /// Returns true if another attempt at the same URL may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::Closed | Self::Backend(_) => false,
        }
    }
}

/// Failure inside a page handler while processing a fetched page
#[derive(Debug, Error)]
#[error("Handler failed for {url}: {message}")]
pub struct HandlerError {
    pub url: String,
    pub message: String,
}

impl HandlerError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Failure while releasing session resources; logged, never surfaced
#[derive(Debug, Error)]
#[error("Teardown error: {0}")]
pub struct TeardownError(pub String);

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL normalization errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Error for one host item, carrying its position in the batch
#[derive(Debug, Error)]
#[error("{source} [item {index}]")]
pub struct ItemError {
    pub index: usize,
    pub source: CrawlError,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use batch::{process_item, run_batch, ItemInput, OutputRecord};
pub use config::Config;
pub use crawler::{CrawlSession, FetchBackend, HttpFetcher};
pub use model::{CrawlOutcome, CrawlRequest, FetchLimits, Operation, PageResult};
pub use crate::url::{cache_bust, normalize};
