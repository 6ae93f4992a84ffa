//! Fetcher retry and backoff behaviour against a mock server

use crate::support::{fetcher_with, test_config, RecordingSleeper};
use std::time::Duration;
use sumi_sift::crawler::TransportError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FETCHER: &str = r#"
[fetcher]
max-retries = 3
backoff-base-ms = 100
user-agent = "SiftTest/1.0"
"#;

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_success_on_first_attempt() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let sleeper = RecordingSleeper::default();
    let fetcher = fetcher_with(&config, sleeper.clone());

    let page = fetcher
        .fetch(&format!("{}/page/1", mock_server.uri()))
        .await
        .expect("fetch should succeed");

    assert_eq!(page.attempts, 1);
    assert_eq!(page.status, 200);
    assert_eq!(page.body, "<html>ok</html>");
    assert!(sleeper.slept().is_empty());
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let mock_server = MockServer::start().await;

    // First two requests fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let sleeper = RecordingSleeper::default();
    let fetcher = fetcher_with(&config, sleeper.clone());

    let page = fetcher
        .fetch(&format!("{}/flaky", mock_server.uri()))
        .await
        .expect("third attempt should succeed");

    assert_eq!(page.attempts, 3);
    assert_eq!(page.body, "finally");
    assert_eq!(request_count(&mock_server).await, 3);
    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test]
async fn test_permanent_failure_stops_after_max_attempts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let sleeper = RecordingSleeper::default();
    let fetcher = fetcher_with(&config, sleeper.clone());

    let failure = fetcher
        .fetch(&format!("{}/down", mock_server.uri()))
        .await
        .expect_err("every attempt fails");

    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.last_error, TransportError::Status(500));
    assert_eq!(request_count(&mock_server).await, 3);
    // No wait after the final attempt
    assert_eq!(sleeper.total(), Duration::from_millis(300));
}

#[tokio::test]
async fn test_client_errors_are_retried_too() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let fetcher = fetcher_with(&config, RecordingSleeper::default());

    let failure = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await
        .expect_err("404 is a failure");

    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.last_error, TransportError::Status(404));
}

#[tokio::test]
async fn test_configured_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "SiftTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let fetcher = fetcher_with(&config, RecordingSleeper::default());

    let page = fetcher
        .fetch(&format!("{}/ua", mock_server.uri()))
        .await
        .expect("request with the configured agent should match");
    assert_eq!(page.body, "hello");
}

#[tokio::test]
async fn test_fetched_page_parses_into_document() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><h1 class="x"> Hi </h1></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), 1, FETCHER);
    let fetcher = fetcher_with(&config, RecordingSleeper::default());
    let page = fetcher
        .fetch(&format!("{}/doc", mock_server.uri()))
        .await
        .unwrap();

    let document = page.document();
    assert_eq!(sumi_sift::extract::query_text(document.root(), ".x"), "Hi");
}
