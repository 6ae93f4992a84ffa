//! Run statistics
//!
//! Summarizes a finished run for the terminal: page outcomes, record count,
//! how often each field came back empty, and a sample of the first record.

use crate::crawler::CrawlResult;
use crate::state::PageState;

/// Longest value shown in the record sample before truncation
const SAMPLE_WIDTH: usize = 80;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Pages generated from the pagination range
    pub total_pages: usize,

    pub pages_succeeded: usize,
    pub pages_failed: usize,
    pub pages_empty: usize,
    pub pages_cancelled: usize,

    pub total_records: usize,

    /// Per field, in column order: how many records hold `""`
    pub empty_fields: Vec<(String, usize)>,

    /// First record as (field, value) pairs
    pub sample: Vec<(String, String)>,

    pub interrupted: bool,
}

impl RunStatistics {
    /// Computes statistics for `result` using `field_names` as the column order
    pub fn from_result(result: &CrawlResult, field_names: &[String]) -> Self {
        let empty_fields = field_names
            .iter()
            .map(|name| {
                let empty = result
                    .records
                    .iter()
                    .filter(|r| r.get(name).map_or(true, str::is_empty))
                    .count();
                (name.clone(), empty)
            })
            .collect();

        let sample = result
            .records
            .first()
            .map(|record| {
                record
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total_pages: result.pages.len().saturating_add(result.pages_cancelled),
            pages_succeeded: result.pages_succeeded,
            pages_failed: result.pages_failed,
            pages_empty: result.pages_empty,
            pages_cancelled: result.pages_cancelled,
            total_records: result.records.len(),
            empty_fields,
            sample,
            interrupted: result.interrupted,
        }
    }

    /// Share of records where `empty` values occurred, as a percentage
    pub fn empty_percentage(&self, empty: usize) -> f64 {
        if self.total_records > 0 {
            (empty as f64 / self.total_records as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Shortens `value` to at most `width` characters, marking the cut with `...`
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let cut: String = value.chars().take(width).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Generated: {}", stats.total_pages);
    println!("  {}: {}", PageState::Processed, stats.pages_succeeded);
    println!("  {}: {}", PageState::Skipped, stats.pages_failed);
    if stats.pages_empty > 0 {
        println!("  No containers matched: {}", stats.pages_empty);
    }
    if stats.interrupted {
        println!("  Cancelled (interrupted): {}", stats.pages_cancelled);
    }
    println!();

    println!("Records:");
    println!("  Total items scraped: {}", stats.total_records);
    println!("  Fields per item: {}", stats.empty_fields.len());
    for (name, empty) in &stats.empty_fields {
        if *empty > 0 {
            println!(
                "  '{}': {} empty values ({:.1}%)",
                name,
                empty,
                stats.empty_percentage(*empty)
            );
        }
    }
    println!();

    if !stats.sample.is_empty() {
        println!("Sample of scraped data (first item):");
        for (name, value) in &stats.sample {
            println!("  • {}: {}", name, truncate(value, SAMPLE_WIDTH));
        }
        println!();
    }
}

/// Prints hints for a run that extracted nothing
pub fn print_troubleshooting() {
    println!("No data was extracted. Check your selectors.\n");
    println!("Troubleshooting tips:");
    println!("  1. Verify the container selector matches elements on the page");
    println!("  2. Check that field selectors are relative to the container");
    println!("  3. Inspect the page HTML to confirm element structure");
    println!("  4. Try the scraper on a simpler page first");
}
