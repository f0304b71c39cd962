//! Cache module for memoizing remote responses on disk
//!
//! Each remote source gets its own `ResponseCache`: a single JSON file mapping
//! a search key to the raw response document. Entries never expire, so a key
//! that has been fetched once is answered locally for the life of the file.

mod manager;

pub use manager::{CacheError, ResponseCache};
