use crate::batch::item::{ItemInput, OutputRecord};
use crate::crawler::{CrawlSession, FetchBackend, SessionSettings};
use crate::model::CrawlOutcome;
use crate::{CrawlError, FetchError, ItemError};
use std::sync::Arc;

/// Builds a fresh fetch backend for each item's session
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn FetchBackend>, FetchError>;
}

impl<F> BackendFactory for F
where
    F: Fn() -> Result<Arc<dyn FetchBackend>, FetchError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn FetchBackend>, FetchError> {
        self()
    }
}

/// Processes one item in its own session
///
/// Validation runs before any backend is created, so a bad record never
/// touches the network. A failure outcome (no page fetched) is escalated to
/// `CrawlError::Failed`.
pub async fn process_item(
    index: usize,
    input: &ItemInput,
    factory: &dyn BackendFactory,
    settings: &SessionSettings,
) -> Result<CrawlOutcome, ItemError> {
    let at = |source: CrawlError| ItemError { index, source };

    let request = input.to_request().map_err(at)?;
    let backend = factory.create().map_err(|e| at(e.into()))?;

    let outcome = CrawlSession::new(request, backend, settings)
        .run()
        .await
        .map_err(at)?;

    if outcome.is_success() {
        Ok(outcome)
    } else {
        Err(at(CrawlError::Failed(outcome.message)))
    }
}

/// Processes items sequentially, one session per item
///
/// # Returns
///
/// * `Ok(Vec<OutputRecord>)` - One record per item; failed items are annotated
///   when `continue_on_failure` is set
/// * `Err(ItemError)` - The first failing item when `continue_on_failure` is off
pub async fn run_batch(
    items: &[ItemInput],
    continue_on_failure: bool,
    factory: &dyn BackendFactory,
    settings: &SessionSettings,
) -> Result<Vec<OutputRecord>, ItemError> {
    let mut records = Vec::with_capacity(items.len());

    for (index, input) in items.iter().enumerate() {
        match process_item(index, input, factory, settings).await {
            Ok(outcome) => records.push(OutputRecord::Success(outcome)),
            Err(e) if continue_on_failure => {
                tracing::warn!("Item {} failed, continuing: {}", index, e.source);
                records.push(OutputRecord::Failed {
                    json: input.clone(),
                    error: e.source.to_string(),
                    item_index: index,
                });
            }
            Err(e) => {
                tracing::error!("Item {} failed, aborting batch: {}", index, e.source);
                return Err(e);
            }
        }
    }

    Ok(records)
}
