//! Fetch capability
//!
//! This module defines the narrow interface the engine uses to reach the network:
//! - `FetchBackend`: fetch a URL, parse a body into a document, tear down
//! - `HttpFetcher`: the reqwest implementation, owning one connection pool
//! - `FetchedPage`: a response handed to exactly one page handler

use crate::config::UserAgentConfig;
use crate::{FetchError, TeardownError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Raw successful response returned by a backend
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// URL after redirects (may still carry the cache-busting token)
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: Vec<u8>,
}

/// A fetched and parsed page, consumed by one handler invocation
pub struct FetchedPage {
    /// The URL as scheduled, without the cache-busting token
    pub requested_url: Url,

    /// The URL after redirects, without the cache-busting token
    pub final_url: Url,

    /// Response body bytes
    pub body: Vec<u8>,

    /// Parsed document for structural queries
    pub document: Html,
}

impl FetchedPage {
    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Capability interface injected into a crawl session
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Fetches a URL; non-success statuses are errors
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError>;

    /// Parses a response body into a queryable document
    fn parse_document(&self, body: &str) -> Html {
        Html::parse_document(body)
    }

    /// Releases connections and other resources. Must be idempotent.
    fn teardown(&self) -> Result<(), TeardownError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total timeout applied by the client itself
///
/// # Example
///
/// ```no_run
/// use seedcrawl::config::UserAgentConfig;
/// use seedcrawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "seedcrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher; one per crawl session
pub struct HttpFetcher {
    client: Mutex<Option<Client>>,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, FetchError> {
        let client = build_http_client(config, timeout)
            .map_err(|e| FetchError::Backend(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    /// Returns true once `teardown` has released the client
    pub fn is_closed(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn client(&self) -> Result<Client, FetchError> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(FetchError::Closed)
    }
}

#[async_trait]
impl FetchBackend for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        let client = self.client()?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!("Fetched {} ({} bytes, status {})", final_url, body.len(), status);

        Ok(FetchedResponse {
            final_url,
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }

    fn teardown(&self) -> Result<(), TeardownError> {
        // Dropping the last client handle closes the pooled connections
        let released = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::debug!("HTTP client released");
        }
        Ok(())
    }
}
