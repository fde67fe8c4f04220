//! HTML parser for store listing cards and detail pages
//!
//! Only a handful of fields are extracted; anything missing on the page is
//! simply left out of the record. Detail records always carry the
//! [`DETAIL_MARKER_FIELD`] so enrichment can recognise them later.

use crate::crawler::Record;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Field present only on records that went through a detail fetch
pub const DETAIL_MARKER_FIELD: &str = "description";

/// Extracts one record per listing card
///
/// Cards without an app id are skipped. `details_base` is used to build the
/// per-app `url` field.
pub fn parse_cards(html: &str, details_base: &Url) -> Vec<Record> {
    let document = Html::parse_document(html);
    let Ok(card_selector) = Selector::parse(r#"div[data-uitype="500"]"#) else {
        return Vec::new();
    };

    document
        .select(&card_selector)
        .filter_map(|card| parse_card(card, details_base))
        .collect()
}

fn parse_card(card: ElementRef<'_>, details_base: &Url) -> Option<Record> {
    let app_id = card
        .value()
        .attr("data-docid")
        .map(str::to_string)
        .or_else(|| first_attr(card, "[data-docid]", "data-docid"))?;

    let mut record = Record::new(app_id.clone()).with("url", details_url(details_base, &app_id));

    if let Some(title) = first_attr(card, "a.title", "title").or_else(|| first_text(card, "a.title")) {
        record.set("title", title);
    }
    if let Some(developer) = first_text(card, "a.subtitle") {
        record.set("developer", developer);
    }
    if let Some(icon) = first_attr(card, "img.cover-image", "data-cover-large")
        .or_else(|| first_attr(card, "img.cover-image", "src"))
    {
        record.set("icon", icon);
    }
    if let Some(price) = first_text(card, "span.display-price") {
        record.set("free", price.eq_ignore_ascii_case("free"));
        record.set("price", price);
    }
    if let Some(score) = first_attr(card, "div.tiny-star", "aria-label").and_then(|l| parse_score(&l)) {
        record.set("score", score);
    }

    Some(record)
}

/// Extracts the detail record of one app
pub fn parse_details(html: &str, app_id: &str, url: &str) -> Record {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut record = Record::new(app_id).with("url", url);

    if let Some(title) = first_text(root, r#"h1[itemprop="name"]"#).or_else(|| first_text(root, "h1")) {
        record.set("title", title);
    }
    if let Some(developer) = first_text(root, r#"a[href*="/store/apps/dev"]"#) {
        record.set("developer", developer);
    }
    if let Some(installs) = first_text(root, r#"div[itemprop="numDownloads"]"#) {
        record.set("installs", installs);
    }
    if let Some(genre) = first_text(root, r#"a[itemprop="genre"]"#) {
        record.set("genre", genre);
    }
    if let Some(score) = first_attr(root, r#"meta[itemprop="ratingValue"]"#, "content")
        .and_then(|s| s.parse::<f64>().ok())
    {
        record.set("score", score);
    }
    if let Some(reviews) = first_attr(root, r#"meta[itemprop="reviewCount"]"#, "content")
        .and_then(|s| s.parse::<u64>().ok())
    {
        record.set("reviews", reviews);
    }

    let description = first_text(root, r#"div[itemprop="description"]"#)
        .or_else(|| first_attr(root, r#"meta[name="description"]"#, "content"))
        .unwrap_or_default();
    record.set(DETAIL_MARKER_FIELD, description);

    record
}

/// `<base>/details?id=<app_id>`
pub fn details_url(details_base: &Url, app_id: &str) -> String {
    let mut url = details_base.clone();
    url.query_pairs_mut().clear().append_pair("id", app_id);
    url.to_string()
}

fn first_text(element: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    element
        .select(&selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_attr(element: ElementRef<'_>, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    element
        .select(&selector)
        .find_map(|e| e.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// "Rated 4.3 stars out of five stars" → 4.3
fn parse_score(label: &str) -> Option<f64> {
    label
        .split_whitespace()
        .find_map(|token| token.parse::<f64>().ok())
}
