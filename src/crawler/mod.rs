//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Pagination URL generation
//! - HTTP fetching with retry and exponential backoff
//! - Overall crawl coordination, pacing and cancellation

mod coordinator;
mod fetcher;
mod pagination;

pub use coordinator::{CrawlResult, Crawler, PageReport};
pub use fetcher::{
    build_http_client, FetchFailure, FetchedPage, Fetcher, RetryPolicy, Sleeper, TokioSleeper,
    TransportError,
};
pub use pagination::{generate, resolve_page_url, PageUrl, PageUrls, PAGE_PLACEHOLDER};

use crate::config::Config;
use crate::SiftError;

/// Runs a complete crawl operation
///
/// This is the main entry point for a run. It will:
/// 1. Build the HTTP client from the fetcher configuration
/// 2. Generate the page URLs from the pagination template
/// 3. Fetch and extract every page, politely paced
/// 4. Return the records in page order with per-page counters
///
/// A run with zero records is still `Ok`; callers decide whether that is
/// a failure (see [`CrawlResult::require_records`]).
pub async fn crawl(config: Config) -> Result<CrawlResult, SiftError> {
    let crawler = Crawler::new(config)?;
    Ok(crawler.run().await)
}
