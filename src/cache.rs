//! Persistent call-result cache.
//!
//! A key→bytes store persisted as a single JSON file, keyed on
//! (operation id, argument tuple). [`CachedFetch`] layers it over any
//! [`Fetch`] implementation so repeated runs against the same revision
//! make zero network calls. Presence of a key means "this exact call was
//! already made"; staleness is accepted, and the file is safe to delete
//! at any time to force a full refetch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fetch::{Fetch, FetchError};

/// Separator between the operation id and each argument in a store key.
const KEY_SEP: char = '\u{1f}';

/// Errors that can occur loading or flushing the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cannot access cache store: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache store is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cache store value is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

// ============================================================================
// Store
// ============================================================================

/// On-disk key→bytes store, loaded once and flushed on every insertion.
///
/// Values are base64 inside the JSON file so binary archive payloads
/// survive the round trip.
pub struct CacheStore {
    path: PathBuf,
    entries: HashMap<String, Vec<u8>>,
}

impl CacheStore {
    /// Loads the store from `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file exists but cannot be read or
    /// decoded.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => {
                let encoded: HashMap<String, String> = serde_json::from_slice(&bytes)?;
                encoded
                    .into_iter()
                    .map(|(key, value)| Ok((key, STANDARD.decode(value)?)))
                    .collect::<Result<_, base64::DecodeError>>()?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "cache store loaded");
        Ok(Self { path, entries })
    }

    /// Builds a store key from an operation id and its argument tuple.
    ///
    /// Arguments are joined with a separator that cannot occur in URLs or
    /// revision ids, so distinct tuples never collide.
    pub fn key(op: &str, args: &[&str]) -> String {
        let mut key = String::from(op);
        for arg in args {
            key.push(KEY_SEP);
            key.push_str(arg);
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Inserts a freshly computed result and flushes the store to disk.
    pub fn insert(&mut self, key: String, value: Vec<u8>) -> Result<(), CacheError> {
        self.entries.insert(key, value);
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<(), CacheError> {
        let encoded: HashMap<&str, String> = self
            .entries
            .iter()
            .map(|(key, value)| (key.as_str(), STANDARD.encode(value)))
            .collect();
        std::fs::write(&self.path, serde_json::to_vec(&encoded)?)?;
        Ok(())
    }
}

// ============================================================================
// Caching Decorator
// ============================================================================

/// [`Fetch`] decorator that memoizes both retrieval primitives.
///
/// A hit returns the stored bytes without touching the inner fetcher.
/// A miss invokes it, stores the result, and flushes. Errors are never
/// cached. A failed flush is logged and the fresh result still returned;
/// the store degrades, the run does not.
pub struct CachedFetch<F> {
    inner: F,
    store: Mutex<CacheStore>,
}

impl<F: Fetch> CachedFetch<F> {
    pub fn new(inner: F, store: CacheStore) -> Self {
        Self {
            inner,
            store: Mutex::new(store),
        }
    }

    fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().unwrap().get(key).map(<[u8]>::to_vec)
    }

    fn remember(&self, key: String, value: Vec<u8>) {
        if let Err(e) = self.store.lock().unwrap().insert(key, value) {
            warn!(error = %e, "failed to flush cache store");
        }
    }
}

#[async_trait]
impl<F: Fetch> Fetch for CachedFetch<F> {
    async fn resolve_head(&self, repo_url: &str) -> Result<String, FetchError> {
        let key = CacheStore::key("resolve_head", &[repo_url]);
        if let Some(hit) = self.lookup(&key) {
            debug!(repo = repo_url, "head served from cache");
            return Ok(String::from_utf8_lossy(&hit).into_owned());
        }
        let head = self.inner.resolve_head(repo_url).await?;
        self.remember(key, head.clone().into_bytes());
        Ok(head)
    }

    async fn fetch_archive(&self, repo_url: &str, revision: &str) -> Result<Vec<u8>, FetchError> {
        let key = CacheStore::key("fetch_archive", &[repo_url, revision]);
        if let Some(hit) = self.lookup(&key) {
            debug!(repo = repo_url, revision, "archive served from cache");
            return Ok(hit);
        }
        let tarball = self.inner.fetch_archive(repo_url, revision).await?;
        self.remember(key, tarball.clone());
        Ok(tarball)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFetch {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetch for CountingFetch {
        async fn resolve_head(&self, repo_url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("head-of-{repo_url}"))
        }

        async fn fetch_archive(
            &self,
            repo_url: &str,
            revision: &str,
        ) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{repo_url}@{revision}").into_bytes())
        }
    }

    fn counting(calls: &Arc<AtomicUsize>) -> CountingFetch {
        CountingFetch {
            calls: Arc::clone(calls),
        }
    }

    #[test]
    fn test_key_separates_argument_tuples() {
        assert_ne!(
            CacheStore::key("fetch", &["ab", "c"]),
            CacheStore::key("fetch", &["a", "bc"])
        );
        assert_ne!(
            CacheStore::key("resolve_head", &["u"]),
            CacheStore::key("fetch_archive", &["u"])
        );
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::load(dir.path().join("cache.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut store = CacheStore::load(&path).unwrap();
        store
            .insert("k".to_string(), vec![0x00, 0xff, 0x7f])
            .unwrap();

        let reloaded = CacheStore::load(&path).unwrap();
        assert_eq!(reloaded.get("k"), Some([0x00, 0xff, 0x7f].as_slice()));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(CacheStore::load(&path), Err(CacheError::Decode(_))));
    }

    #[tokio::test]
    async fn test_second_call_skips_inner_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let store = CacheStore::load(dir.path().join("cache.json")).unwrap();
        let cached = CachedFetch::new(counting(&calls), store);

        let first = cached.resolve_head("https://github.com/o/r").await.unwrap();
        let second = cached.resolve_head("https://github.com/o/r").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_arguments_are_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let store = CacheStore::load(dir.path().join("cache.json")).unwrap();
        let cached = CachedFetch::new(counting(&calls), store);

        let a = cached.fetch_archive("https://r", "rev1").await.unwrap();
        let b = cached.fetch_archive("https://r", "rev2").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_branch_combinator_is_cached_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let store = CacheStore::load(dir.path().join("cache.json")).unwrap();
        let cached = CachedFetch::new(counting(&calls), store);

        // Cold: one resolve plus one download.
        let first = cached.fetch_default_branch("https://r").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Warm: both primitives served from the store.
        let second = cached.fetch_default_branch("https://r").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let warm_calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedFetch::new(counting(&warm_calls), CacheStore::load(&path).unwrap());
        cached.fetch_archive("https://r", "rev").await.unwrap();
        assert_eq!(warm_calls.load(Ordering::SeqCst), 1);
        drop(cached);

        let cold_calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedFetch::new(counting(&cold_calls), CacheStore::load(&path).unwrap());
        let hit = cached.fetch_archive("https://r", "rev").await.unwrap();

        assert_eq!(hit, b"https://r@rev");
        assert_eq!(cold_calls.load(Ordering::SeqCst), 0);
    }
}
