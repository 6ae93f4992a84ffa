//! Integration tests for the fetcher and the crawl coordinator
//!
//! These tests use wiremock to create mock HTTP servers and exercise
//! retries, pacing, extraction and cancellation end-to-end.

mod crawl_tests;
mod fetch_tests;
mod support;
