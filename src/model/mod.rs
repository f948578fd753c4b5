//! Data types shared by the crawl engine
//!
//! - `CrawlRequest` / `Operation`: one validated caller item
//! - `FetchLimits`: dispatcher limits derived from a request
//! - `PageResult` / `CrawlOutcome`: per-page results and the final item result

mod request;
mod result;

pub use request::{
    CrawlRequest, FetchLimits, Operation, DEFAULT_REQUEST_TIMEOUT, LINK_CONCURRENCY,
    MAX_LINK_REQUESTS, REQUESTS_PER_DEPTH,
};
pub use result::{CrawlOutcome, OutcomeStatus, PageResult, Payload};
