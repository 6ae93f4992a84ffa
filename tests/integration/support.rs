//! Shared helpers for integration tests

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_sift::config::{parse_config, Config};
use sumi_sift::crawler::{build_http_client, Fetcher, RetryPolicy, Sleeper};
use tokio::sync::watch;

/// Returns immediately and remembers every requested duration
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.slept.lock().unwrap().push(duration);
        std::future::ready(())
    }
}

/// Signals shutdown the first time anything waits, then never wakes up
#[derive(Clone)]
pub struct InterruptingSleeper {
    shutdown: Arc<watch::Sender<bool>>,
}

impl InterruptingSleeper {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                shutdown: Arc::new(tx),
            },
            rx,
        )
    }
}

impl Sleeper for InterruptingSleeper {
    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        let _ = self.shutdown.send(true);
        std::future::pending()
    }
}

/// A listing page with one `li.item` per title; `None` omits the title node
pub fn listing(items: &[(Option<&str>, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, href)| match title {
            Some(title) => format!(
                r#"<li class="item"><span class="t">{}</span><a href="{}">more</a></li>"#,
                title, href
            ),
            None => format!(r#"<li class="item"><a href="{}">more</a></li>"#, href),
        })
        .collect();
    format!(
        "<html><head><title>Listing</title></head><body><ul>{}</ul></body></html>",
        body
    )
}

/// Configuration for `{base}/page/{page}` with a title/href field map
pub fn test_config(base_url: &str, last_page: i64, extra: &str) -> Config {
    let content = format!(
        r#"
[target]
base-url = "{base}"
pagination-template = "{base}/page/{{page}}"
first-page = 1
last-page = {last}
container-selector = "li.item"

[[field]]
name = "title"
selector = ".t"

[[field]]
name = "href"
selector = "a"
mode = "attribute"
attribute = "href"

{extra}
"#,
        base = base_url,
        last = last_page,
        extra = extra
    );
    parse_config(&content).expect("test config should be valid")
}

pub fn fetcher_with<S: Sleeper>(config: &Config, sleeper: S) -> Fetcher<S> {
    let client = build_http_client(&config.fetcher).expect("Failed to build client");
    Fetcher::new(client, RetryPolicy::from(&config.fetcher), sleeper)
}
