//! CSV output
//!
//! Writes records as delimited rows under a header of field names. Two
//! modes are supported:
//! - `Overwrite` truncates the file and always writes the header
//! - `Append` adds rows to the end and writes the header only when the file
//!   is new or empty, so repeated runs never duplicate it

use crate::extract::Record;
use crate::output::traits::{OutputResult, RecordSink};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// How the CSV file is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// CSV file sink
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    fn needs_header(&self) -> bool {
        match self.mode {
            WriteMode::Overwrite => true,
            WriteMode::Append => std::fs::metadata(&self.path)
                .map(|m| m.len() == 0)
                .unwrap_or(true),
        }
    }
}

impl RecordSink for CsvSink {
    fn write_records(&mut self, field_names: &[String], records: &[Record]) -> OutputResult<usize> {
        if records.is_empty() {
            tracing::warn!("No data to save to {}", self.path.display());
            return Ok(0);
        }

        let header = self.needs_header();
        let file = match self.mode {
            WriteMode::Overwrite => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?,
            WriteMode::Append => OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)?,
        };

        let written = write_csv(file, header, field_names, records)?;
        tracing::info!(
            "{} {} rows to {}",
            match self.mode {
                WriteMode::Overwrite => "Saved",
                WriteMode::Append => "Appended",
            },
            written,
            self.path.display()
        );
        Ok(written)
    }
}

/// Writes records to any writer, optionally preceded by the header row
pub fn write_csv<W: io::Write>(
    writer: W,
    header: bool,
    field_names: &[String],
    records: &[Record],
) -> OutputResult<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    if header {
        wtr.write_record(field_names)?;
    }

    for record in records {
        wtr.write_record(
            field_names
                .iter()
                .map(|name| record.get(name).unwrap_or_default()),
        )?;
    }

    wtr.flush()?;
    Ok(records.len())
}
