use crate::batch::ItemInput;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Seedcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default, rename = "item")]
    pub items: Vec<ItemInput>,
}

/// Engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Budget for one fetch, covering connect, transfer and page handling (seconds)
    pub request_timeout_secs: u64,

    /// Extra attempts for transient fetch failures, bounded by the request budget
    pub max_request_retries: u32,

    /// Pause between attempts at the same URL (milliseconds)
    pub retry_delay_ms: u64,

    /// Whether a failed item is annotated into the output instead of aborting the batch
    pub continue_on_failure: bool,
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_request_retries: 2,
            retry_delay_ms: 500,
            continue_on_failure: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
