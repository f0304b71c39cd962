//! Search orchestration
//!
//! Resolves a term through the matching response cache, normalizes what comes
//! back, records it in the store, and answers with everything stored under
//! that term so far.

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheError, ResponseCache};
use crate::data::books::book_records;
use crate::data::reference::author_references;
use crate::data::{BookRow, CategoryCount, RatingPoint, ReferenceRow};
use crate::store::{InsertOutcome, RecordStore, StoreError};

/// Errors that abort one search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("lookup failed: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one book search
#[derive(Debug, Clone, PartialEq)]
pub struct BookSearch {
    /// Every book stored under the search term
    pub rows: Vec<BookRow>,
    /// Items the catalog returned for the term, stored or not
    pub fetched: usize,
}

/// Owns the per-source caches and the record store
pub struct SearchOrchestrator {
    books: ResponseCache,
    references: ResponseCache,
    store: RecordStore,
}

impl SearchOrchestrator {
    /// Wires the orchestrator together
    ///
    /// # Arguments
    /// * `books` - cache fronting the book catalog
    /// * `references` - cache fronting the encyclopedia
    /// * `store` - record store, expected to have its schema initialized
    pub fn new(books: ResponseCache, references: ResponseCache, store: RecordStore) -> Self {
        Self {
            books,
            references,
            store,
        }
    }

    /// Searches the book catalog for `term`
    ///
    /// Returns every book stored under `term`, so repeated searches show the
    /// cumulative set. Items already stored (possibly under another term) are
    /// skipped but still counted in `fetched`.
    pub async fn search_books(&mut self, term: &str) -> Result<BookSearch, SearchError> {
        let document = self.books.resolve(term).await?;

        let records = book_records(&document, term);
        let mut inserted = 0usize;
        for record in &records {
            if self.store.insert_book(record)? == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        info!(term, fetched = records.len(), inserted, "book search stored");

        Ok(BookSearch {
            rows: self.store.query_books_by_tag(term)?,
            fetched: records.len(),
        })
    }

    /// Looks up encyclopedia pages for `author`
    ///
    /// Per-record insert failures are tolerated; the accumulated stored set
    /// for `author` is returned.
    pub async fn search_author_references(
        &mut self,
        author: &str,
    ) -> Result<Vec<ReferenceRow>, SearchError> {
        let document = self.references.resolve(author).await?;

        for record in author_references(&document, author) {
            if let Err(e) = self.store.insert_author_reference(&record) {
                debug!(author, title = %record.title, error = %e, "reference insert skipped");
            }
        }

        Ok(self.store.query_author_references_by_tag(author)?)
    }

    pub fn category_counts(&self, tag: &str) -> Result<Vec<CategoryCount>, SearchError> {
        Ok(self.store.query_category_counts(tag)?)
    }

    pub fn rating_info(&self, tag: &str) -> Result<Vec<RatingPoint>, SearchError> {
        Ok(self.store.query_rating_info(tag)?)
    }
}
