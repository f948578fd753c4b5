//! Crawler module for bounded page fetching and extraction
//!
//! This module contains the core crawling logic, including:
//! - The fetch backend capability and its reqwest implementation
//! - Request dispatch under a concurrency and volume ceiling
//! - Per-operation page handlers
//! - Session lifecycle and result aggregation

mod aggregate;
mod dispatcher;
mod fetcher;
mod handler;
mod session;

pub use aggregate::finalize;
pub use dispatcher::{CompletionReport, Dispatcher, PageCallback, RetryPolicy};
pub use fetcher::{build_http_client, FetchBackend, FetchedPage, FetchedResponse, HttpFetcher};
pub use handler::{
    extract_links, extract_text, truncate_with_marker, HandlePage, PageHandler, MAX_HTML_CHARS,
    MAX_TEXT_CHARS, TRUNCATION_MARKER,
};
pub use session::{CrawlSession, SessionSettings, SessionState};
