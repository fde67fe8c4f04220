//! Fetch collaborator for store data
//!
//! This module contains:
//! - The [`PlayFetcher`] contract the crawl engine consumes
//! - Catalog constants (collections, categories, paging limits)
//! - A reqwest + scraper implementation talking to the store over HTTP

mod catalog;
mod http;
mod parser;
mod traits;

pub use catalog::{
    category_path, check_paging, collection_path, seed_pairs, CATEGORIES, COLLECTIONS,
    MAX_LISTING_START, MAX_RECORD_SIZE_PER_PAGE,
};
pub use http::{app_details_url, HttpPlayFetcher};
pub use parser::{parse_cards, parse_details, DETAIL_MARKER_FIELD};
pub use traits::{FetchError, PlayFetcher};
