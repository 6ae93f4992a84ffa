//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent string
//! - GET requests to fetch page content
//! - Retry with exponential backoff for any transport failure
//! - Error classification

use crate::config::FetcherConfig;
use crate::extract::Document;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Suspends the calling task; injectable so backoff and pacing can be tested
/// without wall-clock waits
pub trait Sleeper: Clone + Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// How many attempts a page gets and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Wait before the first retry; doubles for every retry after it
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
        }
    }

    /// Backoff after failed attempt `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(config: &FetcherConfig) -> Self {
        Self::new(config.max_retries, config.backoff_base())
    }
}

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// A page that could not be fetched within the retry budget
#[derive(Debug, Clone, Error)]
#[error("failed to fetch {url} after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last_error: TransportError,
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Page body content
    pub body: String,

    /// Attempts used, including the successful one
    pub attempts: u32,
}

impl FetchedPage {
    /// Parses the body into a queryable document
    pub fn document(&self) -> Document {
        Document::parse(&self.body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_sift::config::FetcherConfig;
/// use sumi_sift::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with bounded retries
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Success |
/// | Non-2xx status | Retry with backoff |
/// | Timeout | Retry with backoff |
/// | Connection error | Retry with backoff |
/// | Body read error | Retry with backoff |
/// | Attempts exhausted | `FetchFailure` carrying the last error |
///
/// Backoff after failed attempt `n` (0-based) is `base * 2^n`; there is no
/// wait after the final attempt.
#[derive(Debug, Clone)]
pub struct Fetcher<S: Sleeper = TokioSleeper> {
    client: Client,
    policy: RetryPolicy,
    sleeper: S,
}

impl Fetcher<TokioSleeper> {
    /// Builds a fetcher from configuration using the tokio timer
    pub fn from_config(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client(config)?,
            RetryPolicy::from(config),
            TokioSleeper,
        ))
    }
}

impl<S: Sleeper> Fetcher<S> {
    pub fn new(client: Client, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            client,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetches `url`, retrying per the policy
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to GET
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A 2xx response and its body
    /// * `Err(FetchFailure)` - Every attempt failed; carries the last error
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchFailure> {
        let max = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            tracing::debug!("Fetching: {} (attempt {}/{})", url, attempt + 1, max);

            let error = match self.attempt(url).await {
                Ok((final_url, status, body)) => {
                    return Ok(FetchedPage {
                        url: final_url,
                        status,
                        body,
                        attempts: attempt + 1,
                    });
                }
                Err(e) => e,
            };

            if attempt + 1 >= max {
                tracing::warn!("Failed to fetch {} after {} attempts: {}", url, max, error);
                return Err(FetchFailure {
                    url: url.to_string(),
                    attempts: attempt + 1,
                    last_error: error,
                });
            }

            let delay = self.policy.delay_for(attempt);
            tracing::debug!(
                "Error fetching {}: {}; retrying in {:?}",
                url,
                error,
                delay
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// One GET request; non-2xx statuses count as failures
    async fn attempt(&self, url: &str) -> Result<(String, u16, String), TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok((final_url, status.as_u16(), body))
    }
}
