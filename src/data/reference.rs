//! Wikipedia search client for author lookups
//!
//! Uses the MediaWiki `generator=search` query with `prop=info&inprop=url`, so
//! each matching page comes back with its title and full URL. The cached
//! document is the response's `query` section.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{str_or, AuthorReference, DocumentSource, SourceError, NOT_AVAILABLE, NO_TITLE};

/// Base URL for the English Wikipedia API
const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// The `error` object MediaWiki returns in place of a result
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// Client for the Wikipedia search API
#[derive(Debug, Clone)]
pub struct ReferenceClient {
    client: Client,
    base_url: String,
}

impl ReferenceClient {
    /// Creates a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: WIKIPEDIA_API_URL.to_string(),
        }
    }

    fn query_params(author: &str) -> [(&'static str, &str); 6] {
        [
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", author),
            ("prop", "info"),
            ("inprop", "url"),
        ]
    }
}

#[async_trait]
impl DocumentSource for ReferenceClient {
    fn name(&self) -> &str {
        "wiki"
    }

    async fn fetch(&self, key: &str) -> Result<Value, SourceError> {
        debug!(search = key, "requesting wikipedia search");
        let response = self
            .client
            .get(&self.base_url)
            .query(&Self::query_params(key))
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        query_section(serde_json::from_str(&text)?)
    }
}

/// Extracts the `query` section of a search response for caching
///
/// A response carrying an `error` object is rejected. A response without
/// `query` matched nothing and becomes an empty page set.
pub fn query_section(mut document: Value) -> Result<Value, SourceError> {
    if let Some(error) = document.get("error") {
        let error = ApiError::deserialize(error)?;
        return Err(SourceError::Malformed(format!(
            "wikipedia error {}: {}",
            error.code, error.info
        )));
    }

    Ok(document
        .get_mut("query")
        .map(Value::take)
        .unwrap_or_else(|| json!({ "pages": {} })))
}

impl AuthorReference {
    /// Normalizes one page document from a search result
    pub fn from_page(page: &Value, author: &str) -> Self {
        Self {
            title: str_or(page, "/title", NO_TITLE),
            url: str_or(page, "/fullurl", NOT_AVAILABLE),
            search_tag: author.to_string(),
        }
    }
}

/// Normalizes the pages of a cached `query` section, best search match first
///
/// Pages are ordered by their search rank (`index`), falling back to page id.
pub fn author_references(query: &Value, author: &str) -> Vec<AuthorReference> {
    let Some(pages) = query.get("pages") else {
        return Vec::new();
    };

    let mut ranked: Vec<(i64, i64, &Value)> = match pages {
        Value::Object(map) => map
            .iter()
            .map(|(id, page)| (rank(page), id.parse().unwrap_or(i64::MAX), page))
            .collect(),
        // formatversion=2 responses list pages as an array
        Value::Array(list) => list
            .iter()
            .enumerate()
            .map(|(i, page)| (rank(page), i as i64, page))
            .collect(),
        _ => return Vec::new(),
    };
    ranked.sort_by_key(|(index, id, _)| (*index, *id));

    ranked
        .into_iter()
        .map(|(_, _, page)| AuthorReference::from_page(page, author))
        .collect()
}

fn rank(page: &Value) -> i64 {
    page.get("index").and_then(Value::as_i64).unwrap_or(i64::MAX)
}
