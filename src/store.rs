//! SQLite record store for normalized search results
//!
//! Holds two tables: `Books` (keyed by title and published date) and
//! `WikiResults` (keyed by title). Every query binds its inputs as parameters.

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{AuthorReference, BookRecord, BookRow, CategoryCount, RatingPoint, ReferenceRow};

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "bookdrill.sqlite";

const RESET_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS "Books";
    CREATE TABLE "Books" (
        "Title"         TEXT NOT NULL,
        "Subtitle"      TEXT NOT NULL,
        "Author"        TEXT NOT NULL,
        "PublishedDate" TEXT NOT NULL,
        "Category"      TEXT NOT NULL,
        "Price"         TEXT NOT NULL,
        "AverageRating" REAL NOT NULL,
        "RatingCount"   INTEGER NOT NULL,
        "Keyword"       TEXT NOT NULL,
        PRIMARY KEY ("Title", "PublishedDate")
    );
    DROP TABLE IF EXISTS "WikiResults";
    CREATE TABLE "WikiResults" (
        "Title"       TEXT PRIMARY KEY,
        "Url"         TEXT NOT NULL,
        "SearchTerm"  TEXT NOT NULL
    );
"#;

/// Errors raised by the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to create database directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same identity already exists; nothing was written
    Duplicate,
}

/// Durable store for books and author references
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Opens (or creates) the database file at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "record store opened");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Drops and recreates both tables, discarding all prior rows
    pub fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(RESET_SCHEMA)?;
        info!("record store reset");
        Ok(())
    }

    pub fn insert_book(&self, record: &BookRecord) -> Result<InsertOutcome, StoreError> {
        let result = self.conn.execute(
            r#"INSERT INTO "Books" VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                record.title,
                record.subtitle,
                record.author,
                record.published_date,
                record.category,
                record.price,
                record.average_rating,
                record.rating_count,
                record.search_tag,
            ],
        );
        insert_outcome(result, "Books", &record.title)
    }

    pub fn insert_author_reference(
        &self,
        record: &AuthorReference,
    ) -> Result<InsertOutcome, StoreError> {
        let result = self.conn.execute(
            r#"INSERT INTO "WikiResults" VALUES (?1, ?2, ?3)"#,
            params![record.title, record.url, record.search_tag],
        );
        insert_outcome(result, "WikiResults", &record.title)
    }

    /// Books stored under `tag`, in insertion order
    pub fn query_books_by_tag(&self, tag: &str) -> Result<Vec<BookRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "Title", "Subtitle", "Author", "PublishedDate"
               FROM "Books" WHERE "Keyword" = ?1 ORDER BY rowid"#,
        )?;
        let rows = stmt.query_map([tag], |row| {
            Ok(BookRow {
                title: row.get(0)?,
                subtitle: row.get(1)?,
                author: row.get(2)?,
                published_date: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Author references stored under `tag`, in insertion order
    pub fn query_author_references_by_tag(
        &self,
        tag: &str,
    ) -> Result<Vec<ReferenceRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "Title", "Url" FROM "WikiResults"
               WHERE "SearchTerm" = ?1 ORDER BY rowid"#,
        )?;
        let rows = stmt.query_map([tag], |row| {
            Ok(ReferenceRow {
                title: row.get(0)?,
                url: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Book counts per category under `tag`, largest first
    pub fn query_category_counts(&self, tag: &str) -> Result<Vec<CategoryCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "Category", COUNT(*) FROM "Books"
               WHERE "Keyword" = ?1
               GROUP BY "Category"
               ORDER BY COUNT(*) DESC, "Category""#,
        )?;
        let rows = stmt.query_map([tag], |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                count: row.get::<_, i64>(1)?.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Rating, rating count, and title of each book under `tag`
    pub fn query_rating_info(&self, tag: &str) -> Result<Vec<RatingPoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "AverageRating", "RatingCount", "Title" FROM "Books"
               WHERE "Keyword" = ?1 ORDER BY rowid"#,
        )?;
        let rows = stmt.query_map([tag], |row| {
            Ok(RatingPoint {
                average_rating: row.get(0)?,
                rating_count: row.get(1)?,
                title: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

/// Maps a uniqueness violation to `Duplicate`; anything else is an error
fn insert_outcome(
    result: rusqlite::Result<usize>,
    table: &str,
    title: &str,
) -> Result<InsertOutcome, StoreError> {
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            debug!(table, title, "duplicate row skipped");
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> RecordStore {
        let store = RecordStore::open_in_memory().expect("open in-memory store");
        store.initialize_schema().expect("create schema");
        store
    }

    fn book(title: &str, date: &str, category: &str, tag: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            subtitle: "No subtitle".to_string(),
            author: "Author".to_string(),
            published_date: date.to_string(),
            category: category.to_string(),
            price: "NA".to_string(),
            average_rating: 3.5,
            rating_count: 10,
            search_tag: tag.to_string(),
        }
    }

    fn reference(title: &str, tag: &str) -> AuthorReference {
        AuthorReference {
            title: title.to_string(),
            url: format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_")),
            search_tag: tag.to_string(),
        }
    }

    #[test]
    fn test_books_query_in_insertion_order() {
        let store = test_store();
        store.insert_book(&book("Zeta", "2001", "Fiction", "magic")).unwrap();
        store.insert_book(&book("Alpha", "2002", "Fiction", "magic")).unwrap();
        store.insert_book(&book("Other", "2003", "Fiction", "dragons")).unwrap();

        let rows = store.query_books_by_tag("magic").unwrap();

        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Zeta", "Alpha"]);
        assert_eq!(rows[0].published_date, "2001");
    }

    #[test]
    fn test_category_counts_grouped_by_tag() {
        let store = test_store();
        for i in 0..3 {
            store.insert_book(&book(&format!("F{i}"), "2000", "Fiction", "magic")).unwrap();
        }
        for i in 0..2 {
            store.insert_book(&book(&format!("G{i}"), "2000", "Fantasy", "magic")).unwrap();
        }
        store.insert_book(&book("X", "2000", "Fiction", "other")).unwrap();

        let counts = store.query_category_counts("magic").unwrap();

        assert_eq!(
            counts,
            vec![
                CategoryCount { category: "Fiction".to_string(), count: 3 },
                CategoryCount { category: "Fantasy".to_string(), count: 2 },
            ]
        );
        assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), 5);
    }

    #[test]
    fn test_duplicate_book_is_reported_not_fatal() {
        let store = test_store();

        assert_eq!(
            store.insert_book(&book("Dune", "1965", "Fiction", "dune")).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_book(&book("Dune", "1965", "Fiction", "dune")).unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(store.query_books_by_tag("dune").unwrap().len(), 1);
    }

    #[test]
    fn test_same_title_different_date_are_distinct_books() {
        let store = test_store();
        store.insert_book(&book("Dune", "1965", "Fiction", "dune")).unwrap();

        let outcome = store.insert_book(&book("Dune", "2005", "Fiction", "dune")).unwrap();

        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(store.query_books_by_tag("dune").unwrap().len(), 2);
    }

    #[test]
    fn test_author_reference_title_is_unique() {
        let store = test_store();
        store.insert_author_reference(&reference("Stephen King", "Stephen King")).unwrap();

        let outcome = store
            .insert_author_reference(&reference("Stephen King", "Owen King"))
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert!(store.query_author_references_by_tag("Owen King").unwrap().is_empty());
        let rows = store.query_author_references_by_tag("Stephen King").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://en.wikipedia.org/wiki/Stephen_King");
    }

    #[test]
    fn test_rating_info() {
        let store = test_store();
        let mut rated = book("Rated", "2010", "Fiction", "magic");
        rated.average_rating = 4.5;
        rated.rating_count = 120;
        store.insert_book(&rated).unwrap();

        let points = store.query_rating_info("magic").unwrap();

        assert_eq!(points.len(), 1);
        assert!((points[0].average_rating - 4.5).abs() < 0.001);
        assert_eq!(points[0].rating_count, 120);
        assert_eq!(points[0].title, "Rated");
    }

    #[test]
    fn test_tag_is_bound_not_interpolated() {
        let store = test_store();
        store.insert_book(&book("Safe", "2000", "Fiction", "magic")).unwrap();

        let hostile = r#"magic" OR 1=1; DROP TABLE "Books"; --"#;
        assert!(store.query_books_by_tag(hostile).unwrap().is_empty());
        assert!(store.query_category_counts(hostile).unwrap().is_empty());

        store.insert_book(&book("Quote's", "2000", "Fiction", hostile)).unwrap();
        assert_eq!(store.query_books_by_tag(hostile).unwrap()[0].title, "Quote's");
        assert_eq!(store.query_books_by_tag("magic").unwrap().len(), 1);
    }

    #[test]
    fn test_initialize_schema_discards_rows() {
        let store = test_store();
        store.insert_book(&book("Gone", "2000", "Fiction", "magic")).unwrap();
        store.insert_author_reference(&reference("Gone", "x")).unwrap();

        store.initialize_schema().unwrap();

        assert!(store.query_books_by_tag("magic").unwrap().is_empty());
        assert!(store.query_author_references_by_tag("x").unwrap().is_empty());
    }

    #[test]
    fn test_open_file_persists_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join(DATABASE_FILE);
        {
            let store = RecordStore::open(&path).unwrap();
            store.initialize_schema().unwrap();
            store.insert_book(&book("Kept", "2000", "Fiction", "magic")).unwrap();
        }

        let reopened = RecordStore::open(&path).unwrap();
        assert_eq!(reopened.query_books_by_tag("magic").unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data").join(DATABASE_FILE);

        let store = RecordStore::open(&path).unwrap();
        store.initialize_schema().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_open_reports_unusable_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let result = RecordStore::open(&blocker.join("sub").join(DATABASE_FILE));

        match result {
            Err(StoreError::Io { path, .. }) => assert!(path.ends_with("sub")),
            Err(other) => panic!("expected Io error, got {other}"),
            Ok(_) => panic!("expected Io error, got a store"),
        }
    }
}
