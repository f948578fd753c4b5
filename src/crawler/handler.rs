//! Page handlers, one variant per operation
//!
//! - Links: every `<a href>` / `<area href>` resolved against the page URL
//! - Text: visible body text, trimmed and capped at 50,000 characters
//! - Html: raw body, capped at 100,000 characters

use crate::crawler::fetcher::FetchedPage;
use crate::model::{Operation, PageResult};
use crate::url::normalize;
use crate::HandlerError;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Character cap for extracted text
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Character cap for raw markup
pub const MAX_HTML_CHARS: usize = 100_000;

/// Appended when content is cut at its cap
pub const TRUNCATION_MARKER: &str = "...";

/// Anchor-like elements whose href is harvested
const LINK_SELECTOR: &str = "a[href], area[href]";

/// Elements whose text is never rendered
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Turns a fetched page into a page result
pub trait HandlePage: Send + Sync {
    fn handle(&self, page: FetchedPage) -> Result<PageResult, HandlerError>;
}

/// Operation-specific page handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHandler {
    Links,
    Text,
    Html,
}

impl PageHandler {
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::ExtractLinks => Self::Links,
            Operation::ExtractText => Self::Text,
            Operation::ExtractHtml => Self::Html,
        }
    }
}

impl HandlePage for PageHandler {
    /// Turns one fetched page into one `PageResult`, consuming the page
    fn handle(&self, page: FetchedPage) -> Result<PageResult, HandlerError> {
        let source_url = page.final_url.to_string();

        match self {
            Self::Links => {
                let links = extract_links(&page.document, &page.final_url)?;
                tracing::debug!("Found {} links on {}", links.len(), source_url);
                Ok(PageResult::LinksFound { source_url, links })
            }
            Self::Text => {
                let text = extract_text(&page.document)?;
                Ok(PageResult::TextFound {
                    source_url,
                    text: truncate_with_marker(&text, MAX_TEXT_CHARS),
                })
            }
            Self::Html => Ok(PageResult::HtmlFound {
                html: truncate_with_marker(&page.body_text(), MAX_HTML_CHARS),
                source_url,
            }),
        }
    }
}

/// Extracts all resolvable links from the document
///
/// Hrefs that fail normalization are skipped. Duplicates are kept.
pub fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<String>, HandlerError> {
    let selector = selector(LINK_SELECTOR, base_url.as_str())?;

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| match normalize(base_url, href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::trace!("Skipping href {:?} on {}: {}", href, base_url, e);
                None
            }
        })
        .collect();

    Ok(links)
}

/// Extracts the visible text of the document body, trimmed
pub fn extract_text(document: &Html) -> Result<String, HandlerError> {
    let body_selector = selector("body", "")?;
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    collect_visible_text(root, &mut text);
    Ok(text.trim().to_string())
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if INVISIBLE_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Cuts `content` to `max_chars` characters and appends the marker if anything was cut
///
/// Content at or below the cap is returned unchanged.
pub fn truncate_with_marker(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

fn selector(css: &str, url: &str) -> Result<Selector, HandlerError> {
    Selector::parse(css).map_err(|e| HandlerError::new(url, format!("invalid selector '{}': {:?}", css, e)))
}
