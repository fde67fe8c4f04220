//! Fetch collaborator contract
//!
//! The crawl engine consumes app data only through [`PlayFetcher`]. Errors
//! come in two classes: *validation* errors are permanent (bad id, bad
//! collection/category, bad paging) and are never retried; everything
//! else is *transient* and retried up to the job's ceiling.

use crate::crawler::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a fetch collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("INVALID_APPLICATION_ID: {app_id}. {reason}")]
    InvalidApplicationId { app_id: String, reason: String },

    #[error("INVALID_COLLECTION_OR_CATEGORY_ID: {collection}; {category}. {reason}")]
    InvalidCollectionOrCategory {
        collection: String,
        category: String,
        reason: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse response for {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// True for permanent failures that must not be retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidApplicationId { .. }
                | Self::InvalidCollectionOrCategory { .. }
                | Self::InvalidRequest(_)
        )
    }

    pub fn invalid_app(app_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidApplicationId {
            app_id: app_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_listing(collection: &str, category: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCollectionOrCategory {
            collection: collection.to_string(),
            category: category.to_string(),
            reason: reason.into(),
        }
    }
}

/// Source of app records
///
/// Implementations hold at most a reusable connection session; every call
/// suspends at I/O.
#[async_trait]
pub trait PlayFetcher: Send + Sync {
    /// Full detail record for one app
    async fn details(&self, app_id: &str) -> Result<Record, FetchError>;

    /// One page of a collection listing, optionally narrowed to a category
    async fn collection(
        &self,
        collection: &str,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, FetchError>;

    /// Apps the store lists as similar to `app_id`
    async fn similar(&self, app_id: &str) -> Result<Vec<Record>, FetchError>;

    /// One page of search results
    async fn search(
        &self,
        token: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, FetchError>;
}
