//! Fetch dispatcher: bounded, concurrent fetch-and-handle cycles
//!
//! This module handles:
//! - Concurrency limiting via a semaphore sized from `FetchLimits`
//! - A request budget shared by every attempt, retries included
//! - Per-request timeouts covering fetch and page handling
//! - Cache busting of every outgoing URL
//! - Handler failures aborting the run

use crate::crawler::fetcher::{FetchBackend, FetchedPage, FetchedResponse};
use crate::model::FetchLimits;
use crate::url::{cache_bust_now, strip_cache_buster};
use crate::{CrawlError, FetchError, HandlerError, TeardownError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Callback invoked synchronously with each fetched page
pub type PageCallback = Arc<dyn Fn(FetchedPage) -> Result<(), HandlerError> + Send + Sync>;

/// Retry behavior for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Pause before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(500),
        }
    }
}

/// Summary of one dispatcher run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    /// Fetch attempts issued, retries included
    pub attempted: u32,

    /// Pages fetched and handled
    pub succeeded: u32,

    /// Attempts that failed (including timeouts)
    pub failed: u32,

    /// Frontier entries never fetched because the budget ran out
    pub skipped: u32,

    /// Messages of failed attempts, in completion order
    pub errors: Vec<String>,
}

impl CompletionReport {
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }
}

/// Ceiling on fetch attempts for one run
#[derive(Debug)]
struct RequestBudget {
    max: u32,
    used: AtomicU32,
}

impl RequestBudget {
    fn new(max: u32) -> Self {
        Self {
            max,
            used: AtomicU32::new(0),
        }
    }

    /// Claims one attempt; false once the ceiling is reached
    fn try_acquire(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.max).then_some(used + 1)
            })
            .is_ok()
    }

    fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    fn exhausted(&self) -> bool {
        self.used() >= self.max
    }
}

/// Shared state handed to every fetch task
struct TaskContext {
    backend: Arc<dyn FetchBackend>,
    limits: FetchLimits,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    budget: Arc<RequestBudget>,
    on_page: PageCallback,
}

enum SeedOutcome {
    Delivered,
    Failed,
    Skipped,
    HandlerFailed(HandlerError),
}

struct TaskReport {
    seed: Url,
    attempts: u32,
    errors: Vec<FetchError>,
    outcome: SeedOutcome,
}

/// Dispatcher owning the worker slots and the fetch backend of one session
pub struct Dispatcher {
    backend: Arc<dyn FetchBackend>,
    limits: FetchLimits,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    budget: Arc<RequestBudget>,
}

impl Dispatcher {
    /// Creates a dispatcher
    ///
    /// Limits below 1 are raised to 1.
    pub fn new(backend: Arc<dyn FetchBackend>, limits: FetchLimits, retry: RetryPolicy) -> Self {
        let limits = FetchLimits {
            max_total_requests: limits.max_total_requests.max(1),
            max_concurrency: limits.max_concurrency.max(1),
            ..limits
        };

        Self {
            backend,
            semaphore: Arc::new(Semaphore::new(limits.max_concurrency as usize)),
            budget: Arc::new(RequestBudget::new(limits.max_total_requests)),
            limits,
            retry,
        }
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// Fetch attempts issued so far
    pub fn requests_issued(&self) -> u32 {
        self.budget.used()
    }

    /// Fetches every seed and hands each successful page to `on_page`
    ///
    /// # Flow
    ///
    /// 1. Spawn one task per seed on a `JoinSet`
    /// 2. Each attempt claims a budget slot, then a concurrency permit
    /// 3. The URL gets a uniqueness token, is fetched and handled under the timeout
    /// 4. Transient failures are retried while the retry policy and budget allow
    ///
    /// # Returns
    ///
    /// * `Ok(CompletionReport)` - All seeds resolved; partial failure is not an error
    /// * `Err(CrawlError::Handler)` - A handler failed; remaining tasks are aborted
    pub async fn run(
        &self,
        seeds: Vec<Url>,
        on_page: PageCallback,
    ) -> Result<CompletionReport, CrawlError> {
        let ctx = Arc::new(TaskContext {
            backend: Arc::clone(&self.backend),
            limits: self.limits,
            retry: self.retry,
            semaphore: Arc::clone(&self.semaphore),
            budget: Arc::clone(&self.budget),
            on_page,
        });

        tracing::debug!(
            "Dispatching {} seed(s): budget {}, concurrency {}, timeout {:?}",
            seeds.len(),
            self.limits.max_total_requests,
            self.limits.max_concurrency,
            self.limits.per_request_timeout
        );

        let mut pending = seeds.clone();
        let mut tasks = JoinSet::new();
        for seed in seeds {
            tasks.spawn(fetch_seed(Arc::clone(&ctx), seed));
        }

        let mut report = CompletionReport::default();

        while let Some(joined) = tasks.join_next().await {
            let task = match joined {
                Ok(task) => task,
                Err(e) => {
                    tasks.abort_all();
                    return Err(HandlerError::new(
                        describe_pending(&pending),
                        format!("fetch task failed: {}", e),
                    )
                    .into());
                }
            };
            if let Some(position) = pending.iter().position(|seed| *seed == task.seed) {
                pending.swap_remove(position);
            }

            report.attempted += task.attempts;
            report.failed += task.errors.len() as u32;
            report
                .errors
                .extend(task.errors.iter().map(ToString::to_string));

            match task.outcome {
                SeedOutcome::Delivered => report.succeeded += 1,
                SeedOutcome::Skipped => report.skipped += 1,
                SeedOutcome::Failed => {}
                SeedOutcome::HandlerFailed(err) => {
                    tasks.abort_all();
                    return Err(err.into());
                }
            }
        }

        tracing::debug!(
            "Dispatch complete: {} attempted, {} succeeded, {} failed, {} skipped",
            report.attempted,
            report.succeeded,
            report.failed,
            report.skipped
        );

        Ok(report)
    }

    /// Releases worker slots and the fetch backend
    pub fn shutdown(&self) -> Result<(), TeardownError> {
        self.semaphore.close();
        self.backend.teardown()
    }
}

/// Fetches one seed, retrying transient failures within budget
async fn fetch_seed(ctx: Arc<TaskContext>, seed: Url) -> TaskReport {
    let mut attempts = 0;
    let mut errors = Vec::new();

    let outcome = loop {
        if !ctx.budget.try_acquire() {
            tracing::debug!("Request budget exhausted, not fetching {}", seed);
            break if attempts == 0 {
                SeedOutcome::Skipped
            } else {
                SeedOutcome::Failed
            };
        }
        attempts += 1;

        let permit = match ctx.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                errors.push(FetchError::Closed);
                break SeedOutcome::Failed;
            }
        };
        let result = attempt(&ctx, &seed).await;
        drop(permit);

        match result {
            Ok(Ok(())) => break SeedOutcome::Delivered,
            Ok(Err(handler_error)) => break SeedOutcome::HandlerFailed(handler_error),
            Err(fetch_error) => {
                let retry = fetch_error.is_transient()
                    && attempts <= ctx.retry.max_retries
                    && !ctx.budget.exhausted();
                tracing::warn!(
                    "Fetch attempt {} for {} failed: {}{}",
                    attempts,
                    seed,
                    fetch_error,
                    if retry { ", retrying" } else { "" }
                );
                errors.push(fetch_error);
                if !retry {
                    break SeedOutcome::Failed;
                }
                tokio::time::sleep(ctx.retry.delay).await;
            }
        }
    };

    TaskReport {
        seed,
        attempts,
        errors,
        outcome,
    }
}

/// One fetch + handle cycle under the per-request timeout
async fn attempt(ctx: &TaskContext, seed: &Url) -> Result<Result<(), HandlerError>, FetchError> {
    let target = cache_bust_now(seed);
    let timeout = ctx.limits.per_request_timeout;

    let work = async {
        let response = ctx.backend.fetch(&target).await?;
        Ok::<_, FetchError>(deliver(ctx, seed, response))
    };

    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: seed.to_string(),
            after: timeout,
        }),
    }
}

/// Parses a response and runs the page callback
fn deliver(ctx: &TaskContext, seed: &Url, response: FetchedResponse) -> Result<(), HandlerError> {
    let document = {
        let text = String::from_utf8_lossy(&response.body);
        ctx.backend.parse_document(&text)
    };

    let page = FetchedPage {
        requested_url: seed.clone(),
        final_url: strip_cache_buster(&response.final_url),
        body: response.body,
        document,
    };

    let url = page.final_url.to_string();
    catch_unwind(AssertUnwindSafe(|| (ctx.on_page)(page))).unwrap_or_else(|panic| {
        Err(HandlerError::new(
            url,
            format!("handler panicked: {}", panic_message(panic.as_ref())),
        ))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Names the seeds whose tasks had not reported when a task failed
fn describe_pending(pending: &[Url]) -> String {
    pending
        .iter()
        .map(Url::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
