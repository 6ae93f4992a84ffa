//! Output sink traits and error types
//!
//! A sink receives the finished, ordered records of a run together with the
//! field names that define the column order.

use crate::extract::Record;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record output destinations
pub trait RecordSink {
    /// Writes `records` using `field_names` as the schema and column order
    ///
    /// Returns the number of rows written. Fields missing from a record are
    /// written as empty cells.
    fn write_records(&mut self, field_names: &[String], records: &[Record]) -> OutputResult<usize>;
}
