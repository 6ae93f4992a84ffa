//! Output module for persisting and reporting crawl results
//!
//! This module handles:
//! - Writing records as CSV (overwrite or append)
//! - Summarizing a run's page outcomes and field coverage

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::{write_csv, CsvSink, WriteMode};
pub use stats::{print_statistics, print_troubleshooting, RunStatistics};
pub use traits::{OutputError, OutputResult, RecordSink};
