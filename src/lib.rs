//! Play-Sweeper: a breadth-first app-store catalog crawler
//!
//! This crate discovers apps through collection/category listings, expands
//! discovery through "similar apps" relations, optionally enriches records
//! with per-app detail pages, and persists the accumulated records to disk.
//! Several independent crawl jobs can run at once, each one controllable
//! through the HTTP control API.

pub mod config;
pub mod control;
pub mod crawler;
pub mod fetch;
pub mod server;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Play-Sweeper operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Persistence error: {0}")]
    Persist(#[from] storage::PersistError),

    #[error("Control error: {0}")]
    Control(#[from] control::ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Play-Sweeper operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use control::{Controller, ManagerRegistry, WorkerPool};
pub use crawler::{Frontier, PlayManager, Record};
pub use fetch::{FetchError, HttpPlayFetcher, PlayFetcher};
pub use state::{JobSnapshot, JobStatus, ProcessKind};
