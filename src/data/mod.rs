//! Core data models for bookdrill
//!
//! This module contains the normalized record types persisted by the record
//! store, the rows read back for display, and the remote sources that feed
//! them: the book catalog, the encyclopedia, and the recommendation seed page.

pub mod books;
pub mod reference;
pub mod seed;

pub use books::BooksClient;
pub use reference::ReferenceClient;
pub use seed::{FileSeedSource, ListicleSeedSource, RecommendationSeed, SeedSource, StaticSeedSource};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to a remote source
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed (connection, timeout, or non-success status)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Response parsed but did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Local file backing a source could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A remote source answering free-text keys with a raw JSON document
///
/// Implementations issue exactly one request per call; caching lives in
/// [`crate::cache::ResponseCache`].
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short name of the source, used for its cache file and in logs
    fn name(&self) -> &str;

    /// Fetches the raw response document for `key`
    async fn fetch(&self, key: &str) -> Result<Value, SourceError>;
}

/// Default used when a book has no subtitle
pub const NO_SUBTITLE: &str = "No subtitle";
/// Default used when a book lists no author
pub const NO_AUTHOR: &str = "No author";
/// Default used when a book has no category
pub const NO_CATEGORY: &str = "No category";
/// Default for a missing published date or price
pub const NOT_AVAILABLE: &str = "NA";
/// Default used when a book or page has no title
pub const NO_TITLE: &str = "No title";

/// A normalized book as stored in the `Books` table
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub title: String,
    pub subtitle: String,
    /// First listed author
    pub author: String,
    pub published_date: String,
    /// First listed category
    pub category: String,
    /// List price amount as text, or "NA"
    pub price: String,
    pub average_rating: f64,
    pub rating_count: i64,
    /// Search term that produced this record
    pub search_tag: String,
}

/// A normalized encyclopedia page found for an author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorReference {
    pub title: String,
    pub url: String,
    /// Author name the lookup was made for
    pub search_tag: String,
}

/// Display row for a book search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRow {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub published_date: String,
}

impl BookRow {
    /// Whether this row carries a real author that can be looked up
    pub fn has_author(&self) -> bool {
        self.author != NO_AUTHOR && !self.author.trim().is_empty()
    }
}

/// Display row for an author lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub title: String,
    pub url: String,
}

/// Number of stored books in one category for a search tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Rating data for one stored book, used for the scatter plot
#[derive(Debug, Clone, PartialEq)]
pub struct RatingPoint {
    pub average_rating: f64,
    pub rating_count: i64,
    pub title: String,
}

/// Reads a string at `pointer`, falling back to `default` when absent or not a string
pub(crate) fn str_or(value: &Value, pointer: &str, default: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}
