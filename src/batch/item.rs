use crate::model::{CrawlOutcome, CrawlRequest, Operation};
use crate::CrawlError;
use serde::{Deserialize, Serialize};

/// One raw input record as supplied by the host
///
/// Nothing here is validated until [`ItemInput::to_request`] runs, so a bad
/// record fails only its own item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(
        default,
        rename = "maxDepth",
        alias = "max-depth",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_depth: Option<u32>,
}

impl ItemInput {
    pub fn new(url: impl Into<String>, operation: Operation) -> Self {
        Self {
            url: Some(url.into()),
            operation: Some(operation.as_str().to_string()),
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Validates the record into a crawl request
    ///
    /// A missing operation defaults to `extractLinks`. Performs no I/O.
    pub fn to_request(&self) -> Result<CrawlRequest, CrawlError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CrawlError::Validation("URL is required".to_string()))?;

        let operation = match self.operation.as_deref().map(str::trim) {
            None | Some("") => Operation::ExtractLinks,
            Some(op) => op.parse()?,
        };

        CrawlRequest::new(url, operation, self.max_depth)
    }
}

/// One record emitted to the host per processed item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    /// `{status, message, data}` for a successful item
    Success(CrawlOutcome),

    /// The original input annotated with the error and its position
    #[serde(rename_all = "camelCase")]
    Failed {
        json: ItemInput,
        error: String,
        item_index: usize,
    },
}

impl OutputRecord {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
