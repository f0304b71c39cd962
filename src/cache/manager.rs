//! Read-through response cache backed by one JSON file per source
//!
//! Provides a `ResponseCache` that answers repeated keys from memory and, on a
//! miss, fetches from its source, records the document, and rewrites the whole
//! file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{DocumentSource, SourceError};

/// Errors that can occur while resolving a key through the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The remote fetch on a miss failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The cache file could not be written
    #[error("Failed to write cache file {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The mapping could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Memoizes one remote source's responses on disk
///
/// The file holds a single JSON object mapping each search key to the raw
/// response document. Entries are never expired or replaced.
pub struct ResponseCache {
    source: Box<dyn DocumentSource>,
    path: PathBuf,
    entries: Map<String, Value>,
}

impl ResponseCache {
    /// Loads the cache for `source` from `<cache_dir>/<source name>_cache.json`
    ///
    /// A missing or unreadable file yields an empty cache.
    pub fn load(cache_dir: &Path, source: Box<dyn DocumentSource>) -> Self {
        let path = cache_dir.join(format!("{}_cache.json", source.name()));
        let entries = read_entries(&path);
        debug!(
            source = source.name(),
            entries = entries.len(),
            path = %path.display(),
            "cache loaded"
        );
        Self {
            source,
            path,
            entries,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the source this cache fronts
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the document for `key`, fetching and persisting it on a miss
    ///
    /// # Returns
    /// * `Ok(Value)` - the cached or freshly fetched document
    /// * `Err(CacheError)` - the fetch failed, or the file could not be rewritten
    pub async fn resolve(&mut self, key: &str) -> Result<Value, CacheError> {
        if let Some(document) = self.entries.get(key) {
            debug!(source = self.source.name(), key, "cache hit");
            return Ok(document.clone());
        }

        debug!(source = self.source.name(), key, "cache miss");
        let document = self.source.fetch(key).await?;
        self.entries.insert(key.to_string(), document.clone());
        self.persist()?;
        Ok(document)
    }

    /// Rewrites the full mapping to disk
    fn persist(&self) -> Result<(), CacheError> {
        let to_persist_error = |source| CacheError::Persist {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(to_persist_error)?;
        }
        let json = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, json).map_err(to_persist_error)
    }
}

/// Reads the mapping, treating any failure as a cold start
fn read_entries(path: &Path) -> Map<String, Value> {
    let Ok(content) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str::<Map<String, Value>>(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Echoes the key back and counts fetches
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentSource for CountingSource {
        fn name(&self) -> &str {
            "test"
        }

        async fn fetch(&self, key: &str) -> Result<Value, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Malformed("boom".to_string()));
            }
            Ok(json!({ "echo": key }))
        }
    }

    fn create_test_cache(fail: bool) -> (ResponseCache, Arc<AtomicUsize>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            fail,
        };
        let cache = ResponseCache::load(temp_dir.path(), Box::new(source));
        (cache, calls, temp_dir)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_writes_file() {
        let (mut cache, calls, temp_dir) = create_test_cache(false);

        let doc = cache.resolve("magic").await.expect("resolve should succeed");

        assert_eq!(doc, json!({"echo": "magic"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let path = temp_dir.path().join("test_cache.json");
        assert_eq!(cache.path(), path);
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"magic": {"echo": "magic"}}));
    }

    #[tokio::test]
    async fn test_hit_does_not_fetch() {
        let (mut cache, calls, _temp_dir) = create_test_cache(false);

        cache.resolve("magic").await.unwrap();
        let second = cache.resolve("magic").await.unwrap();

        assert_eq!(second, json!({"echo": "magic"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_exact_strings() {
        let (mut cache, calls, _temp_dir) = create_test_cache(false);

        cache.resolve("Magic").await.unwrap();
        cache.resolve("magic").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains("Magic"));
        assert!(cache.contains("magic"));
    }

    #[tokio::test]
    async fn test_reload_answers_from_disk() {
        let (mut cache, _calls, temp_dir) = create_test_cache(false);
        cache.resolve("dune").await.unwrap();
        cache.resolve("emma").await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut reloaded = ResponseCache::load(
            temp_dir.path(),
            Box::new(CountingSource {
                calls: calls.clone(),
                fail: false,
            }),
        );

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.resolve("emma").await.unwrap(), json!({"echo": "emma"}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_and_is_not_cached() {
        let (mut cache, calls, temp_dir) = create_test_cache(true);

        let result = cache.resolve("magic").await;

        assert!(matches!(result, Err(CacheError::Source(_))));
        assert!(cache.is_empty());
        assert!(!temp_dir.path().join("test_cache.json").exists());

        let _ = cache.resolve("magic").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "failures are not memoized");
    }

    #[test]
    fn test_corrupt_file_is_cold_start() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("test_cache.json"), "{not json").unwrap();

        let cache = ResponseCache::load(
            temp_dir.path(),
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        assert!(cache.is_empty());
    }

    #[test]
    fn test_non_object_file_is_cold_start() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("test_cache.json"), "[1, 2, 3]").unwrap();

        let cache = ResponseCache::load(
            temp_dir.path(),
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        assert!(cache.is_empty());
        assert_eq!(cache.source_name(), "test");
    }

    #[tokio::test]
    async fn test_persist_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("dir");
        let mut cache = ResponseCache::load(
            &nested,
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        cache.resolve("k").await.unwrap();

        assert!(nested.join("test_cache.json").exists());
    }
}
