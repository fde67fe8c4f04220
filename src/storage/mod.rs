//! Storage module for persisting crawl results
//!
//! This module handles all on-disk state of the sweeper:
//! - Chunked JSON dumps of a job's frontier, written atomically
//! - Discovery of previous discovery-mode dumps in a read directory
//! - Loading dumped records back for enrichment

mod dump;
mod load;

pub use dump::{dump_records, ensure_output_dir, output_prefix, ChunkWriter, DumpReport};
pub use load::{discover_detailed_files, discover_dump_files, load_records, load_records_with_retry};

use thiserror::Error;

/// Errors that can occur while reading or writing dump files
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Output directory missing or not writable: {0}")]
    OutputDir(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to move chunk into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for storage operations
pub type PersistResult<T> = Result<T, PersistError>;
