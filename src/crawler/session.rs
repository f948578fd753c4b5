//! Crawl session - one logical crawl for one caller item
//!
//! A session owns its dispatcher (worker slots + fetch backend) from
//! construction until teardown. Teardown runs exactly once on every exit path:
//! after a successful run, after an error, or from `Drop` when the session or
//! its future is dropped early.

use crate::config::EngineConfig;
use crate::crawler::aggregate::finalize;
use crate::crawler::dispatcher::{Dispatcher, PageCallback, RetryPolicy};
use crate::crawler::fetcher::{FetchBackend, FetchedPage};
use crate::crawler::handler::{HandlePage, PageHandler};
use crate::model::{CrawlOutcome, CrawlRequest, FetchLimits, PageResult, DEFAULT_REQUEST_TIMEOUT};
use crate::{CrawlError, HandlerError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Lifecycle of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Constructed, dispatcher resources acquired, nothing fetched yet
    Created,

    /// Dispatcher is fetching and handling pages
    Running,

    /// Page results are being reduced into an outcome
    Finalizing,

    /// An error was raised while running or finalizing
    Errored,

    /// Resources released; the session is not reused
    TornDown,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TornDown)
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Running, Finalizing)
                | (Running, Errored)
                | (Finalizing, Errored)
                | (Created, TornDown)
                | (Finalizing, TornDown)
                | (Errored, TornDown)
        )
    }
}

/// Engine settings applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&EngineConfig> for SessionSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            retry: RetryPolicy {
                max_retries: config.max_request_retries,
                delay: config.retry_delay(),
            },
        }
    }
}

/// One crawl: dispatcher, page handler and result accumulator
pub struct CrawlSession {
    request: CrawlRequest,
    dispatcher: Dispatcher,
    handler: Arc<dyn HandlePage>,
    state: SessionState,
}

impl CrawlSession {
    /// Creates a session, taking ownership of the backend for its lifetime
    pub fn new(
        request: CrawlRequest,
        backend: Arc<dyn FetchBackend>,
        settings: &SessionSettings,
    ) -> Self {
        let handler = Arc::new(PageHandler::for_operation(request.operation()));
        Self::with_handler(request, backend, settings, handler)
    }

    /// Creates a session with a custom page handler
    pub fn with_handler(
        request: CrawlRequest,
        backend: Arc<dyn FetchBackend>,
        settings: &SessionSettings,
        handler: Arc<dyn HandlePage>,
    ) -> Self {
        let limits = FetchLimits::for_request(&request, settings.request_timeout);
        let dispatcher = Dispatcher::new(backend, limits, settings.retry);

        Self {
            request,
            dispatcher,
            handler,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn limits(&self) -> FetchLimits {
        self.dispatcher.limits()
    }

    /// Runs the crawl to completion and tears the session down
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Success, or a failure outcome when no page was fetched
    /// * `Err(CrawlError)` - A handler failed; resources are already released
    pub async fn run(mut self) -> Result<CrawlOutcome, CrawlError> {
        tracing::info!(
            "Starting {} for {}",
            self.request.operation(),
            self.request.seed_url()
        );

        let result = self.execute().await;

        match &result {
            Ok(outcome) => tracing::info!("Finished {}: {}", self.request.seed_url(), outcome.message),
            Err(e) => {
                tracing::warn!("Crawl of {} failed: {}", self.request.seed_url(), e);
                if self.state.can_transition_to(SessionState::Errored) {
                    self.state = SessionState::Errored;
                }
            }
        }

        self.teardown();
        result
    }

    async fn execute(&mut self) -> Result<CrawlOutcome, CrawlError> {
        self.transition(SessionState::Running)?;

        let accumulator: Arc<Mutex<Vec<PageResult>>> = Arc::default();
        let handler = Arc::clone(&self.handler);
        let sink = Arc::clone(&accumulator);
        let on_page: PageCallback = Arc::new(move |page: FetchedPage| -> Result<(), HandlerError> {
            let result = handler.handle(page)?;
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(result);
            Ok(())
        });

        let report = self
            .dispatcher
            .run(vec![self.request.seed_url().clone()], on_page)
            .await?;

        self.transition(SessionState::Finalizing)?;

        let results = std::mem::take(&mut *accumulator.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(finalize(
            results,
            self.request.operation(),
            self.request.seed_url().as_str(),
            &report,
        ))
    }

    fn transition(&mut self, next: SessionState) -> Result<(), CrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Releases dispatcher resources; runs at most once
    fn teardown(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Err(e) = self.dispatcher.shutdown() {
            tracing::warn!("Ignoring teardown failure for {}: {}", self.request.seed_url(), e);
        }
        self.state = SessionState::TornDown;
    }
}

impl Drop for CrawlSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
