//! CSV submission logging module
//!
//! Appends one line per relayed request so that writeback failures, which the
//! relay never retries, leave a record outside the process.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

use crate::relay::{RequestOutcome, RequestState};

/// Submission record for CSV logging
#[derive(Debug, Serialize)]
pub struct SubmissionRecord {
    /// Time the request reached its terminal state (ISO 8601 format)
    pub timestamp: String,
    /// Request id assigned by the oracle contract
    pub request_id: String,
    /// Contract that asked for the price
    pub caller_address: String,
    /// "SUBMITTED" or "FALLBACK"
    pub outcome: String,
    /// Fetch attempts made
    pub attempts: u32,
    /// Fixed-point value sent to the contract
    pub price: String,
    /// Whether the setLatestEthPrice transaction went through
    pub writeback_ok: bool,
    /// Writeback error, empty on success
    pub error: String,
}

impl SubmissionRecord {
    pub fn from_outcome(timestamp: DateTime<Utc>, outcome: &RequestOutcome) -> Self {
        let label = match outcome.state {
            RequestState::Submitted => "SUBMITTED",
            RequestState::FallbackSubmitted => "FALLBACK",
            RequestState::Attempting(_) => "PENDING",
        };

        Self {
            timestamp: timestamp.to_rfc3339(),
            request_id: outcome.request.id.to_string(),
            caller_address: format!("{:?}", outcome.request.caller_address),
            outcome: label.to_string(),
            attempts: outcome.attempts,
            price: outcome.submitted_value.to_string(),
            writeback_ok: outcome.writeback_error.is_none(),
            error: outcome.writeback_error.clone().unwrap_or_default(),
        }
    }
}

/// Append a submission record to the CSV file
///
/// Headers are written only when the file is created.
pub fn log_submission(file_path: &str, record: &SubmissionRecord) -> Result<()> {
    let path = Path::new(file_path);
    let file_exists = path.exists();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open CSV file: {}", file_path))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer
        .serialize(record)
        .context("Failed to write CSV record")?;

    writer.flush().context("Failed to flush CSV writer")?;

    Ok(())
}
