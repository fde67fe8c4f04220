//! Observable view of a crawl job
//!
//! A `JobSnapshot` is what `peek`, `stop` and `view` return. While a job is
//! RUNNING it carries the elapsed time and live frontier size; once closed
//! it carries the total time taken and the output path instead.

use crate::state::{JobStatus, ProcessKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of a recorded job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// At least one dump chunk could not be written
    DataDumpFailure,

    /// A previously dumped file could not be loaded for enrichment
    DataLoadFailure,

    /// The worker could not create the job's execution context
    InitializationFailure,
}

/// One entry of a job's failure list
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Point-in-time view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub process_id: String,
    pub process_type: ProcessKind,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_taken: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_collected: Option<usize>,

    pub records_found: usize,
    pub records_processed: usize,
    pub records_failed: usize,
    pub failures: Vec<Failure>,
    pub dump_success: Option<bool>,
    pub logfile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<String>>,
}

impl JobSnapshot {
    /// Snapshot of a job that exists only as a registry placeholder
    pub fn initiated(process_id: impl Into<String>, kind: ProcessKind, logfile: Option<String>) -> Self {
        Self {
            process_id: process_id.into(),
            process_type: kind,
            status: JobStatus::Initiated,
            start_time: None,
            stop_time: None,
            time_elapsed: None,
            total_time_taken: None,
            records_collected: None,
            records_found: 0,
            records_processed: 0,
            records_failed: 0,
            failures: Vec::new(),
            dump_success: None,
            logfile,
            optfile: None,
            records: None,
        }
    }

    /// Drops the record id list unless the caller asked for it
    pub fn with_records(mut self, show_records: bool) -> Self {
        if !show_records {
            self.records = None;
        }
        self
    }
}
