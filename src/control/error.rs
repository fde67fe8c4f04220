//! Errors surfaced at the control boundary

use crate::fetch::FetchError;
use thiserror::Error;

/// Failure of a control request, carrying its HTTP status
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid value for {param}: {value}")]
    InvalidParam { param: &'static str, value: String },

    #[error("No process with id {0}")]
    NotFound(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Worker pool unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ControlError {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingParam(_) | Self::InvalidParam { .. } => 400,
            Self::NotFound(_) => 404,
            Self::NotImplemented(_) => 405,
            Self::Unprocessable(_) => 422,
            Self::Unavailable(_) => 503,
            Self::Fetch(e) if e.is_validation() => 422,
            Self::Fetch(_) => 502,
        }
    }

    /// Machine-readable error code for JSON bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParam(_) => "MISSING_PARAMETER",
            Self::InvalidParam { .. } => "INVALID_PARAMETER",
            Self::NotFound(_) => "PROCESS_NOT_FOUND",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Unprocessable(_) => "UNPROCESSABLE",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Fetch(e) if e.is_validation() => "INVALID_REQUEST",
            Self::Fetch(_) => "UPSTREAM_FAILURE",
        }
    }
}
