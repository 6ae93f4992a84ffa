//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a run from the first generated page URL to the last:
//! - Dispatching pages in ascending order under a global concurrency cap
//! - Pacing dispatches with the polite delay
//! - Fetching and extracting each page in its own task
//! - Reassembling records in page order regardless of completion order
//! - Stopping early on cancellation while keeping everything already collected

use crate::config::{validate, Config};
use crate::crawler::fetcher::{Fetcher, FetchedPage, Sleeper, TokioSleeper};
use crate::crawler::pagination::{generate, resolve_page_url, PageUrl};
use crate::extract::{extract_page, FieldMap, PageExtraction, Record};
use crate::state::PageState;
use crate::SiftError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use url::Url;

/// What happened to one page
#[derive(Debug, Clone)]
pub struct PageReport {
    pub page: i64,
    pub url: String,
    pub state: PageState,

    /// Elements matched by the container selector
    pub containers: usize,

    /// Records contributed to the result
    pub records: usize,

    /// Attempts used by the fetcher, 0 if the page was never requested
    pub attempts: u32,

    /// Why the page was skipped or came back empty
    pub error: Option<String>,
}

/// Accumulated output of one run
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Records ordered by page number, then container order within the page
    pub records: Vec<Record>,

    /// One report per page reached before the run ended, ascending by page
    /// number; cancelled pages are only counted
    pub pages: Vec<PageReport>,

    /// Pages fetched and extracted
    pub pages_succeeded: usize,

    /// Pages skipped after exhausting fetch retries
    pub pages_failed: usize,

    /// Pages fetched successfully whose container selector matched nothing
    pub pages_empty: usize,

    /// Pages never requested because the run was cancelled
    pub pages_cancelled: usize,

    /// True when the run stopped early on a shutdown signal
    pub interrupted: bool,
}

impl CrawlResult {
    /// Pages that reached a terminal state through fetching
    pub fn pages_visited(&self) -> usize {
        self.pages_succeeded + self.pages_failed
    }

    /// Converts a zero-record run into `SiftError::EmptyResult`
    pub fn require_records(self) -> Result<Self, SiftError> {
        if self.records.is_empty() {
            Err(SiftError::EmptyResult {
                pages_visited: self.pages_visited(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Result of a single page task
struct PageOutcome {
    report: PageReport,
    records: Vec<Record>,
}

/// Main crawler structure
///
/// Holds the immutable pieces of a run: what to fetch, how to extract it and
/// how to pace it. One crawler can execute any number of runs.
pub struct Crawler<S: Sleeper = TokioSleeper> {
    base_url: Url,
    template: String,
    first_page: i64,
    last_page: i64,
    container_selector: Arc<str>,
    field_map: Arc<FieldMap>,
    polite_delay: Duration,
    max_concurrent: usize,
    fetcher: Arc<Fetcher<S>>,
}

impl Crawler<TokioSleeper> {
    /// Creates a crawler with an HTTP fetcher built from the configuration
    pub fn new(config: Config) -> Result<Self, SiftError> {
        let fetcher = Fetcher::from_config(&config.fetcher)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<S: Sleeper> Crawler<S> {
    /// Creates a crawler around an existing fetcher
    ///
    /// The fetcher's sleeper also paces the polite delay between pages.
    ///
    /// # Arguments
    ///
    /// * `config` - The extraction configuration; validated here
    /// * `fetcher` - Fetcher used for every page of every run
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(SiftError)` - Invalid configuration or base URL
    pub fn with_fetcher(config: Config, fetcher: Fetcher<S>) -> Result<Self, SiftError> {
        validate(&config)?;
        let field_map = config.field_map()?;
        let base_url = Url::parse(&config.target.base_url)?;

        Ok(Self {
            base_url,
            template: config.target.pagination_template,
            first_page: config.target.first_page,
            last_page: config.target.last_page,
            container_selector: Arc::from(config.target.container_selector),
            field_map: Arc::new(field_map),
            polite_delay: config.crawler.polite_delay(),
            max_concurrent: config.crawler.max_concurrent_pages.max(1) as usize,
            fetcher: Arc::new(fetcher),
        })
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Runs the crawl to completion
    pub async fn run(&self) -> CrawlResult {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_until(shutdown).await
    }

    /// Runs the crawl until every page is visited or `shutdown` turns true
    ///
    /// On shutdown no new fetch is started; fetches already in flight finish
    /// (or time out) and their records are kept. Pages never reached are
    /// only counted.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Receiver that flips to `true` when the run should stop
    ///
    /// # Returns
    ///
    /// The records collected so far, one report per page reached and the
    /// run counters
    pub async fn run_until(&self, mut shutdown: watch::Receiver<bool>) -> CrawlResult {
        let mut pages = generate(&self.template, self.first_page, self.last_page);
        let total = pages.len();
        tracing::info!(
            "Crawling {} page(s) with up to {} in flight",
            total,
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles: Vec<(PageUrl, JoinHandle<PageOutcome>)> = Vec::new();
        let mut outcomes: BTreeMap<i64, PageOutcome> = BTreeMap::new();
        let mut interrupted = false;
        let mut position = 0usize;

        for page in pages.by_ref() {
            position += 1;
            if *shutdown.borrow() {
                interrupted = true;
                break;
            }

            let url = match resolve_page_url(&self.base_url, &page.url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Page {}: unusable URL '{}': {}", page.page, page.url, e);
                    outcomes.insert(page.page, unusable_url_outcome(page, e.to_string()));
                    continue;
                }
            };

            // Acquired before the delay so the delay separates fetches, not queueing
            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        interrupted = true;
                        break;
                    }
                },
                _ = wait_for_shutdown(&mut shutdown) => {
                    interrupted = true;
                    break;
                }
            };

            if !handles.is_empty() && !self.polite_delay.is_zero() {
                tracing::debug!("Waiting {:?} before next page", self.polite_delay);
                tokio::select! {
                    _ = self.fetcher.sleeper().sleep(self.polite_delay) => {}
                    _ = wait_for_shutdown(&mut shutdown) => {
                        interrupted = true;
                        break;
                    }
                }
            }

            tracing::info!("--- Page {} ({}/{}) ---", page.page, position, total);

            let fetcher = Arc::clone(&self.fetcher);
            let container_selector = Arc::clone(&self.container_selector);
            let field_map = Arc::clone(&self.field_map);
            let task_page = page.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_page(&fetcher, task_page, url, &container_selector, &field_map).await
            });
            handles.push((page, handle));
        }

        // The page that observed the shutdown plus everything still ungenerated
        let cancelled = if interrupted {
            pages.len().saturating_add(1)
        } else {
            0
        };

        if interrupted {
            tracing::warn!(
                "Crawl interrupted; {} page(s) cancelled, waiting for {} in-flight page(s)",
                cancelled,
                handles.iter().filter(|(_, h)| !h.is_finished()).count()
            );
        }

        for (page, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Page {} task failed: {}", page.page, e);
                    failed_task_outcome(page, e.to_string())
                }
            };
            outcomes.insert(outcome.report.page, outcome);
        }

        let result = assemble(outcomes, interrupted, cancelled);
        tracing::info!(
            "Crawl finished: {} records from {} page(s) ({} failed, {} empty{})",
            result.records.len(),
            result.pages_succeeded,
            result.pages_failed,
            result.pages_empty,
            if result.interrupted {
                format!(", {} cancelled", result.pages_cancelled)
            } else {
                String::new()
            }
        );
        result
    }
}

/// Resolves once `shutdown` is true; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Fetches and extracts one page
async fn process_page<S: Sleeper>(
    fetcher: &Fetcher<S>,
    page: PageUrl,
    url: Url,
    container_selector: &str,
    field_map: &FieldMap,
) -> PageOutcome {
    let mut state = PageState::Pending;
    state.advance(PageState::Fetching);

    let fetched = match fetcher.fetch(url.as_str()).await {
        Ok(fetched) => fetched,
        Err(failure) => {
            state.advance(PageState::Skipped);
            tracing::warn!("Failed to fetch page {}, skipping: {}", page.page, failure);
            return PageOutcome {
                report: PageReport {
                    page: page.page,
                    url: url.to_string(),
                    state,
                    containers: 0,
                    records: 0,
                    attempts: failure.attempts,
                    error: Some(failure.to_string()),
                },
                        records: Vec::new(),
            };
        }
    };

    state.advance(PageState::Extracting);
    let extraction = extract_fetched(&fetched, container_selector, field_map);
    state.advance(PageState::Processed);

    let error = if let Some(e) = &extraction.container_error {
        Some(e.to_string())
    } else if extraction.is_empty() {
        tracing::warn!(
            "Page {}: container selector '{}' matched nothing",
            page.page,
            container_selector
        );
        Some(format!(
            "container selector '{}' matched 0 elements",
            container_selector
        ))
    } else {
        None
    };

    tracing::info!(
        "Page {}: extracted {} items",
        page.page,
        extraction.records.len()
    );

    PageOutcome {
        report: PageReport {
            page: page.page,
            url: fetched.url.clone(),
            state,
            containers: extraction.containers_found,
            records: extraction.records.len(),
            attempts: fetched.attempts,
            error,
        },
        records: extraction.records,
    }
}

/// Parses and extracts synchronously; the parsed document never lives across an await
fn extract_fetched(
    fetched: &FetchedPage,
    container_selector: &str,
    field_map: &FieldMap,
) -> PageExtraction {
    let document = fetched.document();
    extract_page(&document, container_selector, field_map)
}

fn unusable_url_outcome(page: PageUrl, reason: String) -> PageOutcome {
    skipped_outcome(page, format!("unusable URL: {}", reason))
}

fn failed_task_outcome(page: PageUrl, reason: String) -> PageOutcome {
    skipped_outcome(page, format!("page task failed: {}", reason))
}

fn skipped_outcome(page: PageUrl, error: String) -> PageOutcome {
    let mut state = PageState::Pending;
    state.advance(PageState::Skipped);
    PageOutcome {
        report: PageReport {
            page: page.page,
            url: page.url,
            state,
            containers: 0,
            records: 0,
            attempts: 0,
            error: Some(error),
        },
        records: Vec::new(),
    }
}

/// Flattens per-page outcomes in page order and tallies the counters
fn assemble(
    outcomes: BTreeMap<i64, PageOutcome>,
    interrupted: bool,
    cancelled: usize,
) -> CrawlResult {
    let mut result = CrawlResult {
        interrupted,
        pages_cancelled: cancelled,
        ..CrawlResult::default()
    };

    for (_, outcome) in outcomes {
        let report = outcome.report;
        debug_assert!(report.state.is_terminal(), "page {} not finished", report.page);
        if report.state.is_success() {
            result.pages_succeeded += 1;
            if report.containers == 0 {
                result.pages_empty += 1;
            }
        } else {
            result.pages_failed += 1;
        }
        result.records.extend(outcome.records);
        result.pages.push(report);
    }

    result
}
