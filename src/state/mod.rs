//! State module for tracking crawl-job progress
//!
//! # Components
//!
//! - `JobStatus`: lifecycle status of a job (initiated, running, closing, closed)
//! - `ProcessKind`: what a job does (discovery or enrichment)
//! - `JobSnapshot`: the observable view returned to the control surface

mod job_status;
mod process_kind;
mod snapshot;

// Re-export main types
pub use job_status::JobStatus;
pub use process_kind::ProcessKind;
pub use snapshot::{Failure, FailureKind, JobSnapshot};
