//! Reduces per-page results into one outcome for the caller

use crate::crawler::dispatcher::CompletionReport;
use crate::model::{CrawlOutcome, Operation, PageResult, Payload};
use std::collections::HashSet;

/// Merges page results into the final outcome of one item
///
/// - Links: all link lists flattened and deduplicated (first-seen order kept);
///   an empty set is still a success
/// - Text / Html: the single page result is passed through unchanged
/// - No page handled: a failure outcome explaining why
pub fn finalize(
    results: Vec<PageResult>,
    operation: Operation,
    seed_url: &str,
    report: &CompletionReport,
) -> CrawlOutcome {
    if results.is_empty() {
        return CrawlOutcome::failure(failure_message(seed_url, report));
    }

    if operation.is_single_page() && results.len() > 1 {
        tracing::warn!(
            "{} produced {} page results for {}, keeping the first",
            operation,
            results.len(),
            seed_url
        );
    }

    match operation {
        Operation::ExtractLinks => {
            let links = dedup_links(results);
            CrawlOutcome::success(
                format!("Successfully extracted {} links from {}", links.len(), seed_url),
                Payload::Links {
                    url: seed_url.to_string(),
                    links,
                },
            )
        }
        Operation::ExtractText => match results.into_iter().next() {
            Some(PageResult::TextFound { text, .. }) => CrawlOutcome::success(
                format!("Successfully extracted text from {}", seed_url),
                Payload::Text {
                    url: seed_url.to_string(),
                    text,
                },
            ),
            other => mismatched(operation, seed_url, other),
        },
        Operation::ExtractHtml => match results.into_iter().next() {
            Some(PageResult::HtmlFound { html, .. }) => CrawlOutcome::success(
                format!("Successfully extracted HTML from {}", seed_url),
                Payload::Html {
                    url: seed_url.to_string(),
                    html,
                },
            ),
            other => mismatched(operation, seed_url, other),
        },
    }
}

/// Flattens link results into a duplicate-free list
fn dedup_links(results: Vec<PageResult>) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .flat_map(|result| match result {
            PageResult::LinksFound { links, .. } => links,
            PageResult::TextFound { .. } | PageResult::HtmlFound { .. } => Vec::new(),
        })
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn failure_message(seed_url: &str, report: &CompletionReport) -> String {
    match report.last_error() {
        Some(error) => format!("Failed to fetch {}: {}", seed_url, error),
        None if report.skipped > 0 => {
            format!("Failed to fetch {}: request budget exhausted", seed_url)
        }
        None => format!("Failed to fetch {}: no page was retrieved", seed_url),
    }
}

fn mismatched(operation: Operation, seed_url: &str, result: Option<PageResult>) -> CrawlOutcome {
    CrawlOutcome::failure(format!(
        "{} for {} produced an unexpected result from {}",
        operation,
        seed_url,
        result.as_ref().map(PageResult::source_url).unwrap_or("no page")
    ))
}
