//! End-to-end crawls against a mock listing site

use crate::support::{fetcher_with, listing, test_config, InterruptingSleeper, RecordingSleeper};
use std::time::Duration;
use sumi_sift::crawler::Crawler;
use sumi_sift::output::{CsvSink, RecordSink, WriteMode};
use sumi_sift::{PageState, SiftError};
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PACING: &str = r#"
[fetcher]
max-retries = 2
backoff-base-ms = 100

[crawler]
polite-delay-ms = 1000
"#;

async fn mount_page(server: &MockServer, page: i64, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/page/{}", page)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn titles(records: &[sumi_sift::Record]) -> Vec<String> {
    records.iter().map(|r| r["title"].to_string()).collect()
}

#[tokio::test]
async fn test_missing_field_resolves_to_empty_string() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        1,
        listing(&[
            (Some("First"), "/a"),
            (Some("Second"), "/b"),
            (None, "/c"),
        ]),
    )
    .await;

    let config = test_config(&mock_server.uri(), 1, PACING);
    let sleeper = RecordingSleeper::default();
    let crawler = Crawler::with_fetcher(config.clone(), fetcher_with(&config, sleeper.clone()))
        .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert_eq!(result.records.len(), 3);
    assert_eq!(titles(&result.records), vec!["First", "Second", ""]);
    for (record, href) in result.records.iter().zip(["/a", "/b", "/c"]) {
        assert_eq!(record.len(), 2);
        assert_eq!(&record["href"], href);
    }
    assert_eq!(result.pages_succeeded, 1);
    // A single page has nobody to be polite to
    assert!(sleeper.slept().is_empty());
}

#[tokio::test]
async fn test_failed_page_is_skipped_not_fatal() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[(Some("p1-a"), "/1a"), (Some("p1-b"), "/1b")])).await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 3, listing(&[(Some("p3-a"), "/3a")])).await;

    let config = test_config(&mock_server.uri(), 3, PACING);
    let sleeper = RecordingSleeper::default();
    let crawler = Crawler::with_fetcher(config.clone(), fetcher_with(&config, sleeper.clone()))
        .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert_eq!(titles(&result.records), vec!["p1-a", "p1-b", "p3-a"]);
    assert_eq!(result.pages_failed, 1);
    assert_eq!(result.pages_succeeded, 2);
    assert!(!result.interrupted);

    let states: Vec<_> = result.pages.iter().map(|p| p.state).collect();
    assert_eq!(
        states,
        vec![PageState::Processed, PageState::Skipped, PageState::Processed]
    );
    assert_eq!(result.pages[1].attempts, 2);
    assert!(result.pages[1].error.is_some());

    // Polite delay before pages 2 and 3, one backoff inside page 2, nothing after page 3
    assert_eq!(
        sleeper.slept(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(100),
            Duration::from_millis(1000)
        ]
    );
}

#[tokio::test]
async fn test_concurrent_pages_keep_page_order() {
    let mock_server = MockServer::start().await;

    // Earlier pages answer more slowly, so completion order is reversed
    for page in 1..=4u64 {
        let first = format!("p{}-a", page);
        let second = format!("p{}-b", page);
        Mock::given(method("GET"))
            .and(path(format!("/page/{}", page)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing(&[
                        (Some(first.as_str()), "/x"),
                        (Some(second.as_str()), "/y"),
                    ]))
                    .set_delay(Duration::from_millis(50 * (5 - page))),
            )
            .mount(&mock_server)
            .await;
    }

    let extra = r#"
[crawler]
polite-delay-ms = 0
max-concurrent-pages = 4
"#;
    let config = test_config(&mock_server.uri(), 4, extra);
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert_eq!(
        titles(&result.records),
        vec!["p1-a", "p1-b", "p2-a", "p2-b", "p3-a", "p3-b", "p4-a", "p4-b"]
    );
    assert_eq!(result.pages_succeeded, 4);
}

#[tokio::test]
async fn test_empty_pages_are_reported_separately() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[(Some("only"), "/o")])).await;
    mount_page(
        &mock_server,
        2,
        "<html><body><p>No results</p></body></html>".to_string(),
    )
    .await;

    let config = test_config(&mock_server.uri(), 2, PACING);
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.pages_succeeded, 2);
    assert_eq!(result.pages_empty, 1);
    assert_eq!(result.pages[1].containers, 0);
    assert!(result.pages[1]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("matched 0 elements"));
}

#[tokio::test]
async fn test_zero_records_is_an_empty_result_error() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, "<html><body></body></html>".to_string()).await;

    let config = test_config(&mock_server.uri(), 1, PACING);
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");

    let result = crawler.run().await;
    assert!(result.records.is_empty());
    assert!(matches!(
        result.require_records(),
        Err(SiftError::EmptyResult { pages_visited: 1 })
    ));
}

#[tokio::test]
async fn test_reversed_range_fetches_nothing() {
    let mock_server = MockServer::start().await;

    let mut config = test_config(&mock_server.uri(), 3, PACING);
    config.target.first_page = 5;
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert!(result.pages.is_empty());
    assert!(result.records.is_empty());
    assert!(mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_interrupt_keeps_collected_records() {
    let mock_server = MockServer::start().await;
    for page in 1..=3 {
        let title = format!("p{}", page);
        mount_page(&mock_server, page, listing(&[(Some(title.as_str()), "/x")])).await;
    }

    let config = test_config(&mock_server.uri(), 3, PACING);
    let (sleeper, shutdown) = InterruptingSleeper::new();
    let crawler = Crawler::with_fetcher(config.clone(), fetcher_with(&config, sleeper))
        .expect("Failed to create crawler");

    // The polite delay before page 2 raises the interrupt
    let result = crawler.run_until(shutdown).await;

    assert!(result.interrupted);
    assert_eq!(titles(&result.records), vec!["p1"]);
    assert_eq!(result.pages_succeeded, 1);
    assert_eq!(result.pages_cancelled, 2);
    assert_eq!(result.pages_failed, 0);
    assert_eq!(
        mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_interrupt_counts_remaining_pages_without_walking_them() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri(), i64::MAX, PACING);
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");

    let (_shutdown_tx, shutdown) = watch::channel(true);
    let result = crawler.run_until(shutdown).await;

    assert!(result.interrupted);
    assert_eq!(result.pages_cancelled, i64::MAX as usize);
    assert!(result.pages.is_empty());
    assert!(result.records.is_empty());
    assert!(mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_unusable_urls_do_not_spend_polite_delay() {
    let mock_server = MockServer::start().await;
    let mut config = test_config(&mock_server.uri(), 3, PACING);
    // "[n" opens an IPv6 host that never closes
    config.target.pagination_template = "http://[{page}/list".to_string();

    let sleeper = RecordingSleeper::default();
    let crawler = Crawler::with_fetcher(config.clone(), fetcher_with(&config, sleeper.clone()))
        .expect("Failed to create crawler");

    let result = crawler.run().await;

    assert_eq!(result.pages_failed, 3);
    assert_eq!(result.pages.len(), 3);
    for report in &result.pages {
        assert_eq!(report.state, PageState::Skipped);
        assert_eq!(report.attempts, 0);
    }
    assert!(sleeper.slept().is_empty());
    assert!(mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_crawl_to_csv() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[(Some("Bulbasaur"), "/b")])).await;
    mount_page(&mock_server, 2, listing(&[(Some("Ivysaur"), "/i")])).await;

    let config = test_config(&mock_server.uri(), 2, PACING);
    let field_names = config.field_names();
    let crawler = Crawler::with_fetcher(
        config.clone(),
        fetcher_with(&config, RecordingSleeper::default()),
    )
    .expect("Failed to create crawler");
    let result = crawler.run().await.require_records().expect("records");

    let dir = tempfile::TempDir::new().unwrap();
    let csv_path = dir.path().join("scraped.csv");
    let mut sink = CsvSink::new(&csv_path, WriteMode::Append);
    sink.write_records(&field_names, &result.records).unwrap();
    sink.write_records(&field_names, &result.records).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        content,
        "title,href\nBulbasaur,/b\nIvysaur,/i\nBulbasaur,/b\nIvysaur,/i\n"
    );
}
