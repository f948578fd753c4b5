use serde::Serialize;

/// Result of handling one fetched page, one variant per operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    /// Absolute links found on the page, duplicates allowed
    LinksFound {
        source_url: String,
        links: Vec<String>,
    },

    /// Visible body text, already truncated
    TextFound { source_url: String, text: String },

    /// Raw markup, already truncated
    HtmlFound { source_url: String, html: String },
}

impl PageResult {
    pub fn source_url(&self) -> &str {
        match self {
            Self::LinksFound { source_url, .. }
            | Self::TextFound { source_url, .. }
            | Self::HtmlFound { source_url, .. } => source_url,
        }
    }
}

/// Terminal status of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Operation payload carried by a successful outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Links { url: String, links: Vec<String> },
    Text { url: String, text: String },
    Html { url: String, html: String },
}

/// Terminal value for one crawl item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl CrawlOutcome {
    pub fn success(message: impl Into<String>, payload: Payload) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            message: message.into(),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
