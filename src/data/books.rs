//! Google Books API client
//!
//! Fetches volume search results and normalizes each returned item into a
//! [`BookRecord`]. Every field is read independently with its own default, so
//! a sparse item still produces a record.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{
    str_or, BookRecord, DocumentSource, SourceError, NOT_AVAILABLE, NO_AUTHOR, NO_CATEGORY,
    NO_SUBTITLE, NO_TITLE,
};

/// Base URL for the Google Books volumes endpoint
const GOOGLE_BOOKS_BASE_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Largest page size the volumes endpoint accepts
pub const MAX_RESULTS_LIMIT: u32 = 40;

/// Default number of results requested per search
pub const DEFAULT_MAX_RESULTS: u32 = 25;

/// Client for the Google Books volumes search
#[derive(Debug, Clone)]
pub struct BooksClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_results: u32,
}

impl BooksClient {
    /// Creates a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: GOOGLE_BOOKS_BASE_URL.to_string(),
            api_key: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Sets the static API key sent with every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the page size, clamped to what the API accepts
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);
        self
    }

    /// Builds the query parameters for a search
    fn query_params(&self, search_term: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", search_term.to_string()),
            ("printType", "books".to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }
}

#[async_trait]
impl DocumentSource for BooksClient {
    fn name(&self) -> &str {
        "google_books"
    }

    async fn fetch(&self, key: &str) -> Result<Value, SourceError> {
        debug!(query = key, "requesting google books volumes");
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(key))
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        volumes_document(serde_json::from_str(&text)?)
    }
}

/// Checks the shape of a volumes response before it is cached
pub fn volumes_document(document: Value) -> Result<Value, SourceError> {
    if !document.is_object() {
        return Err(SourceError::Malformed(
            "books response is not a JSON object".to_string(),
        ));
    }
    Ok(document)
}

impl BookRecord {
    /// Normalizes one volume item from a books response
    ///
    /// # Arguments
    /// * `item` - A single entry of the response's `items` array
    /// * `search_tag` - The search term the item was returned for
    pub fn from_item(item: &Value, search_tag: &str) -> Self {
        let average_rating = item
            .pointer("/volumeInfo/averageRating")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let rating_count = item
            .pointer("/volumeInfo/ratingsCount")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        Self {
            title: str_or(item, "/volumeInfo/title", NO_TITLE),
            subtitle: str_or(item, "/volumeInfo/subtitle", NO_SUBTITLE),
            author: str_or(item, "/volumeInfo/authors/0", NO_AUTHOR),
            published_date: str_or(item, "/volumeInfo/publishedDate", NOT_AVAILABLE),
            category: str_or(item, "/volumeInfo/categories/0", NO_CATEGORY),
            price: price_text(item),
            average_rating,
            rating_count,
            search_tag: search_tag.to_string(),
        }
    }
}

/// Renders the list price amount as text; "NA" when not for sale
fn price_text(item: &Value) -> String {
    match item.pointer("/saleInfo/listPrice/amount") {
        Some(Value::Number(amount)) => amount.to_string(),
        Some(Value::String(amount)) => amount.clone(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Normalizes every item of a books response
///
/// A response without `items` (no matches) yields an empty list.
pub fn book_records(document: &Value, search_tag: &str) -> Vec<BookRecord> {
    document
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| BookRecord::from_item(item, search_tag))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_item() -> Value {
        json!({
            "volumeInfo": {
                "title": "The Night Circus",
                "subtitle": "A Novel",
                "authors": ["Erin Morgenstern", "Someone Else"],
                "publishedDate": "2011-09-13",
                "categories": ["Fiction", "Fantasy"],
                "averageRating": 4.5,
                "ratingsCount": 212
            },
            "saleInfo": {
                "listPrice": {"amount": 9.99, "currencyCode": "USD"}
            }
        })
    }

    #[test]
    fn test_from_item_extracts_all_fields() {
        let record = BookRecord::from_item(&full_item(), "magic");

        assert_eq!(record.title, "The Night Circus");
        assert_eq!(record.subtitle, "A Novel");
        assert_eq!(record.author, "Erin Morgenstern");
        assert_eq!(record.published_date, "2011-09-13");
        assert_eq!(record.category, "Fiction");
        assert_eq!(record.price, "9.99");
        assert!((record.average_rating - 4.5).abs() < 0.001);
        assert_eq!(record.rating_count, 212);
        assert_eq!(record.search_tag, "magic");
    }

    #[test]
    fn test_from_item_defaults_missing_subtitle_and_ratings() {
        let item = json!({
            "volumeInfo": {
                "title": "Practical Magic",
                "authors": ["Alice Hoffman"],
                "publishedDate": "1995",
                "categories": ["Fiction"]
            },
            "saleInfo": {"listPrice": {"amount": 12.5}}
        });

        let record = BookRecord::from_item(&item, "magic");

        assert_eq!(record.subtitle, NO_SUBTITLE);
        assert_eq!(record.average_rating, 0.0);
        assert_eq!(record.rating_count, 0);
        assert_eq!(record.title, "Practical Magic");
        assert_eq!(record.author, "Alice Hoffman");
        assert_eq!(record.published_date, "1995");
        assert_eq!(record.category, "Fiction");
        assert_eq!(record.price, "12.5");
    }

    #[test]
    fn test_from_item_empty_item_uses_every_default() {
        let record = BookRecord::from_item(&json!({}), "x");

        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.author, NO_AUTHOR);
        assert_eq!(record.published_date, NOT_AVAILABLE);
        assert_eq!(record.category, NO_CATEGORY);
        assert_eq!(record.price, NOT_AVAILABLE);
    }

    #[test]
    fn test_from_item_accepts_integer_rating() {
        let item = json!({"volumeInfo": {"title": "T", "averageRating": 4}});
        let record = BookRecord::from_item(&item, "t");
        assert!((record.average_rating - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_from_item_empty_authors_array() {
        let item = json!({"volumeInfo": {"title": "T", "authors": []}});
        assert_eq!(BookRecord::from_item(&item, "t").author, NO_AUTHOR);
    }

    #[test]
    fn test_book_records_without_items_is_empty() {
        let doc = json!({"kind": "books#volumes", "totalItems": 0});
        assert!(book_records(&doc, "nothing").is_empty());
    }

    #[test]
    fn test_book_records_preserves_item_order() {
        let doc = json!({"items": [
            {"volumeInfo": {"title": "First"}},
            {"volumeInfo": {"title": "Second"}}
        ]});
        let titles: Vec<String> = book_records(&doc, "t").into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_query_params_include_key_only_when_set() {
        let client = BooksClient::with_client(Client::new()).with_max_results(100);
        let params = client.query_params("dune");
        assert!(params.contains(&("q", "dune".to_string())));
        assert!(params.contains(&("printType", "books".to_string())));
        assert!(params.contains(&("maxResults", "40".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "key"));

        let client = client.with_api_key(Some("secret".to_string()));
        assert!(client.query_params("dune").contains(&("key", "secret".to_string())));
    }

    #[test]
    fn test_volumes_document_requires_object() {
        let doc = json!({"kind": "books#volumes", "totalItems": 0});
        assert_eq!(volumes_document(doc.clone()).unwrap(), doc);

        for bad in [json!([]), json!("books"), Value::Null] {
            assert!(matches!(
                volumes_document(bad),
                Err(SourceError::Malformed(_))
            ));
        }
    }
}
