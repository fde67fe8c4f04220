//! reqwest-backed fetch collaborator
//!
//! # Error mapping
//!
//! | Condition | Error kind |
//! |-----------|------------|
//! | Unknown collection/category, bad paging | validation |
//! | HTTP 4xx (except 408/429) on an id/listing URL | validation |
//! | HTTP 408, 429, 5xx | transient (`Status`) |
//! | Connection/timeout/body errors | transient (`Http`) |

use crate::config::FetchConfig;
use crate::crawler::Record;
use crate::fetch::catalog::{category_path, check_paging, collection_path};
use crate::fetch::parser::{details_url, parse_cards, parse_details};
use crate::fetch::{FetchError, PlayFetcher};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use url::Url;

/// HTTP fetch collaborator holding one reusable connection pool
#[derive(Debug, Clone)]
pub struct HttpPlayFetcher {
    client: Client,
    base_url: Url,
    language: String,
    country: String,
}

/// How a non-success status for a given request should be reported
enum Target<'a> {
    App(&'a str),
    Listing { collection: &'a str, category: &'a str },
    Search,
}

impl HttpPlayFetcher {
    /// Builds the collaborator and its HTTP client
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("Invalid base URL: {}", e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|source| FetchError::Http {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            language: config.language.clone(),
            country: config.country.clone(),
        })
    }

    /// Appends path segments to the store root
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                FetchError::InvalidRequest(format!("Base URL {} cannot take a path", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Listing POST body understood by the store
    fn listing_form(page: usize, page_size: usize) -> Vec<(&'static str, String)> {
        vec![
            ("ipf", "1".to_string()),
            ("xhr", "1".to_string()),
            ("start", (page * page_size).to_string()),
            ("num", page_size.to_string()),
            ("numChildren", "0".to_string()),
        ]
    }

    /// Sends a request with the locale parameters and returns the body
    async fn send(&self, request: RequestBuilder, url: &Url, target: Target<'_>) -> Result<String, FetchError> {
        let response = request
            .query(&[("hl", self.language.as_str()), ("gl", self.country.as_str())])
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, url, target));
        }

        response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }
}

fn classify_status(status: StatusCode, url: &Url, target: Target<'_>) -> FetchError {
    let transient = status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT;
    if transient || !status.is_client_error() {
        return FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
    }

    let reason = format!("HTTP {}", status.as_u16());
    match target {
        Target::App(app_id) => FetchError::invalid_app(app_id, reason),
        Target::Listing { collection, category } => {
            FetchError::invalid_listing(collection, category, reason)
        }
        Target::Search => FetchError::InvalidRequest(reason),
    }
}

#[async_trait]
impl PlayFetcher for HttpPlayFetcher {
    async fn details(&self, app_id: &str) -> Result<Record, FetchError> {
        let mut url = self.endpoint(&["details"])?;
        url.query_pairs_mut().append_pair("id", app_id);

        let body = self
            .send(self.client.get(url.clone()), &url, Target::App(app_id))
            .await?;

        tracing::trace!("Fetched details for {}", app_id);
        Ok(parse_details(&body, app_id, &url.to_string()))
    }

    async fn collection(
        &self,
        collection: &str,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, FetchError> {
        let coln_path = collection_path(collection).ok_or_else(|| {
            FetchError::invalid_listing(collection, category, "unknown collection")
        })?;
        let catg_path = category_path(category)
            .ok_or_else(|| FetchError::invalid_listing(collection, category, "unknown category"))?;
        check_paging(page, page_size)?;

        let url = if catg_path.is_empty() {
            self.endpoint(&["collection", coln_path])?
        } else {
            self.endpoint(&["category", catg_path, "collection", coln_path])?
        };

        let request = self
            .client
            .post(url.clone())
            .form(&Self::listing_form(page, page_size));
        let body = self
            .send(request, &url, Target::Listing { collection, category })
            .await?;

        Ok(parse_cards(&body, &self.endpoint(&["details"])?))
    }

    async fn similar(&self, app_id: &str) -> Result<Vec<Record>, FetchError> {
        let mut url = self.endpoint(&["similar"])?;
        url.query_pairs_mut().append_pair("id", app_id);

        let body = self
            .send(self.client.get(url.clone()), &url, Target::App(app_id))
            .await?;

        let records = parse_cards(&body, &self.endpoint(&["details"])?);
        tracing::trace!("{} similar apps for {}", records.len(), app_id);
        Ok(records)
    }

    async fn search(
        &self,
        token: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, FetchError> {
        if token.trim().is_empty() {
            return Err(FetchError::InvalidRequest("Search token cannot be empty".to_string()));
        }
        check_paging(page, page_size)?;

        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut()
            .append_pair("q", token)
            .append_pair("c", "apps");

        let request = self
            .client
            .post(url.clone())
            .form(&Self::listing_form(page, page_size));
        let body = self.send(request, &url, Target::Search).await?;

        Ok(parse_cards(&body, &self.endpoint(&["details"])?))
    }
}

/// Detail page URL for an app under the configured store root
pub fn app_details_url(config: &FetchConfig, app_id: &str) -> Option<String> {
    let mut base = Url::parse(&config.base_url).ok()?;
    base.path_segments_mut().ok()?.pop_if_empty().push("details");
    Some(details_url(&base, app_id))
}
