use crate::extract::{ExtractionRule, FieldMap};
use crate::output::WriteMode;
use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Sift
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Ordered field map; order is the output column order
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldEntry>,
}

impl Config {
    /// Builds the field map from the `[[field]]` entries
    pub fn field_map(&self) -> Result<FieldMap, ConfigError> {
        let mut map = FieldMap::new();
        for entry in &self.fields {
            if map.insert(entry.name.clone(), entry.to_rule()?).is_some() {
                return Err(ConfigError::Validation(format!(
                    "Field name '{}' is used more than once",
                    entry.name
                )));
            }
        }
        Ok(map)
    }

    /// Field names in output order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// What to crawl and where the items live on each page
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Site root; relative pagination URLs are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// URL pattern containing the `{page}` placeholder
    #[serde(rename = "pagination-template")]
    pub pagination_template: String,

    #[serde(rename = "first-page", default = "default_first_page")]
    pub first_page: i64,

    /// Inclusive
    #[serde(rename = "last-page")]
    pub last_page: i64,

    /// Selector matching one element per item
    #[serde(rename = "container-selector")]
    pub container_selector: String,
}

/// HTTP fetch behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per page, including the first
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry `n` (0-based) is `backoff-base-ms * 2^n`
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Sent with every request; some sites reject default client identifiers
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Crawl pacing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pause between successive page fetches (milliseconds)
    #[serde(rename = "polite-delay-ms", default = "default_polite_delay_ms")]
    pub polite_delay_ms: u64,

    /// Pages fetched at once; 1 keeps strict page-by-page processing
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: u32,
}

impl CrawlerConfig {
    pub fn polite_delay(&self) -> Duration {
        Duration::from_millis(self.polite_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            polite_delay_ms: default_polite_delay_ms(),
            max_concurrent_pages: default_max_concurrent_pages(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV file
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    #[serde(default)]
    pub mode: WriteMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            mode: WriteMode::default(),
        }
    }
}

/// How a `[[field]]` entry reads its match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    #[default]
    Text,
    Attribute,
    #[serde(alias = "html")]
    Markup,
}

/// One `[[field]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    /// Column name in the output
    pub name: String,

    /// Selector evaluated relative to each container
    pub selector: String,

    #[serde(default)]
    pub mode: FieldMode,

    /// Required for, and only allowed with, `mode = "attribute"`
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldEntry {
    pub fn to_rule(&self) -> Result<ExtractionRule, ConfigError> {
        match (self.mode, &self.attribute) {
            (FieldMode::Text, None) => Ok(ExtractionRule::text(&self.selector)),
            (FieldMode::Markup, None) => Ok(ExtractionRule::markup(&self.selector)),
            (FieldMode::Attribute, Some(attribute)) if !attribute.is_empty() => {
                Ok(ExtractionRule::attribute(&self.selector, attribute))
            }
            (FieldMode::Attribute, _) => Err(ConfigError::Validation(format!(
                "Field '{}' uses attribute mode but names no attribute",
                self.name
            ))),
            (_, Some(_)) => Err(ConfigError::Validation(format!(
                "Field '{}' sets an attribute but its mode is not 'attribute'",
                self.name
            ))),
        }
    }
}

fn default_first_page() -> i64 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    String::from(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    )
}

fn default_polite_delay_ms() -> u64 {
    1000
}

fn default_max_concurrent_pages() -> u32 {
    1
}

fn default_csv_path() -> String {
    String::from("scraped_data.csv")
}
