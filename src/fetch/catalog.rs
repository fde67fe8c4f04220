//! Store catalog constants
//!
//! Discovery seeds one pagination task per entry of
//! `COLLECTIONS × CATEGORIES`.

use crate::fetch::FetchError;

/// Largest page the store will serve
pub const MAX_RECORD_SIZE_PER_PAGE: usize = 120;

/// Largest listing offset (`page * page_size`) the store accepts
pub const MAX_LISTING_START: usize = 500;

/// Collection ids crawled by discovery
pub const COLLECTIONS: [&str; 6] = [
    "NEW_FREE",
    "NEW_PAID",
    "TOP_FREE",
    "TOP_PAID",
    "TOP_GROSSING",
    "TRENDING",
];

/// Category ids crawled by discovery
pub const CATEGORIES: [&str; 18] = [
    "GAME",
    "GAME_ACTION",
    "GAME_ADVENTURE",
    "GAME_ARCADE",
    "GAME_BOARD",
    "GAME_CARD",
    "GAME_CASINO",
    "GAME_CASUAL",
    "GAME_EDUCATIONAL",
    "GAME_MUSIC",
    "GAME_PUZZLE",
    "GAME_RACING",
    "GAME_ROLE_PLAYING",
    "GAME_SIMULATION",
    "GAME_SPORTS",
    "GAME_STRATEGY",
    "GAME_TRIVIA",
    "GAME_WORD",
];

/// Maps a collection id to the store's path segment
///
/// Ids starting with `promotion` are passed through untouched.
pub fn collection_path(collection: &str) -> Option<&str> {
    if collection.starts_with("promotion") {
        return Some(collection);
    }
    match collection {
        "NEW_FREE" => Some("topselling_new_free"),
        "NEW_PAID" => Some("topselling_new_paid"),
        "TOP_FREE" => Some("topselling_free"),
        "TOP_PAID" => Some("topselling_paid"),
        "TOP_GROSSING" => Some("topgrossing"),
        "TRENDING" => Some("movers_shakers"),
        _ => None,
    }
}

/// Maps a category id to the store's path segment
///
/// The empty category means "no category filter".
pub fn category_path(category: &str) -> Option<&str> {
    if category.is_empty() || CATEGORIES.contains(&category) {
        Some(category)
    } else {
        None
    }
}

/// Rejects paging requests the store refuses to serve
pub fn check_paging(page: usize, page_size: usize) -> Result<(), FetchError> {
    if page_size == 0 || page_size > MAX_RECORD_SIZE_PER_PAGE {
        return Err(FetchError::InvalidRequest(format!(
            "Number of results must be between 1 and {}, got {}",
            MAX_RECORD_SIZE_PER_PAGE, page_size
        )));
    }

    if page.saturating_mul(page_size) > MAX_LISTING_START {
        return Err(FetchError::InvalidRequest(format!(
            "Start (page * results) cannot be greater than {}, got {}",
            MAX_LISTING_START,
            page.saturating_mul(page_size)
        )));
    }

    Ok(())
}

/// Every collection/category pair discovery seeds from
pub fn seed_pairs() -> impl Iterator<Item = (&'static str, &'static str)> {
    COLLECTIONS
        .iter()
        .flat_map(|coln| CATEGORIES.iter().map(move |catg| (*coln, *catg)))
}
