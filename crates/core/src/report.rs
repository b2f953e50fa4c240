//! Per-file log rows and the batch summary.

use std::fmt;
use std::io;

use serde::Serialize;

use crate::types::{Method, TitleExtraction};

/// Column order of the processing log.
pub const LOG_HEADER: [&str; 7] = [
    "original_name",
    "transformed_name",
    "score",
    "method",
    "explanation",
    "status",
    "original_text_sample",
];

/// `strftime` pattern for the timestamp in the log file name.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SKIPPED_NAME: &str = "SKIPPED";
const ERROR_NAME: &str = "ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Skipped,
    Error,
}

/// One row of the processing log. Field order matches [`LOG_HEADER`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub original_name: String,
    pub transformed_name: String,
    pub score: f64,
    pub method: Method,
    pub explanation: String,
    pub status: Status,
    pub original_text_sample: String,
}

impl LogRow {
    /// Row for a file that went through extraction. `new_name` is `None`
    /// when no title was found.
    pub fn from_extraction(
        original_name: impl Into<String>,
        new_name: Option<&str>,
        result: &TitleExtraction,
    ) -> Self {
        let (transformed_name, status) = match new_name {
            Some(name) => (name.to_string(), Status::Success),
            None => (SKIPPED_NAME.to_string(), Status::Skipped),
        };

        LogRow {
            original_name: original_name.into(),
            transformed_name,
            score: result.score(),
            method: result.method(),
            explanation: result.explanation().to_string(),
            status,
            original_text_sample: result.original_text_sample().to_string(),
        }
    }

    /// Row for a file whose processing failed outright.
    pub fn error(original_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        LogRow {
            original_name: original_name.into(),
            transformed_name: ERROR_NAME.to_string(),
            score: 0.0,
            method: Method::Error,
            explanation: reason.to_string(),
            status: Status::Error,
            original_text_sample: String::new(),
        }
    }
}

/// Name of the log file for a run started at `timestamp`, formatted with
/// [`LOG_TIMESTAMP_FORMAT`].
pub fn log_file_name(timestamp: &str) -> String {
    format!("pdf_rename_log_{timestamp}.csv")
}

/// Write the header and all rows as CSV.
///
/// The header is always written, so an empty batch still yields a valid log.
pub fn write_log<W: io::Write>(writer: W, rows: &[LogRow]) -> Result<(), csv::Error> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(LOG_HEADER)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Counts shown at the end of a batch. Errors are also counted as skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_rows(rows: &[LogRow]) -> Self {
        rows.iter().fold(Summary::default(), |mut acc, row| {
            match row.status {
                Status::Success => acc.processed += 1,
                Status::Skipped => acc.skipped += 1,
                Status::Error => {
                    acc.skipped += 1;
                    acc.errors += 1;
                }
            }
            acc
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processed: {}, Skipped: {}", self.processed, self.skipped)
    }
}
